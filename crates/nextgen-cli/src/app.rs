use std::io::Write;

use anyhow::Result;
use chrono::Local;
use nextgen_core::{
    ChatError, Conversation, ConversationStore, Message, MessageStatus, NoticeLevel, Notifier,
    ReplyPhase, Role, StoreEvent,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use crate::clipboard::SystemClipboard;
use crate::commands::{handle_command, resolve_conversation, CommandResult};

const PROMPT: &str = "› ";

/// Prints notices to stderr, like toasts above the prompt.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        let tag = match level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "aviso",
            NoticeLevel::Error => "error",
        };
        eprintln!("\r[{tag}] {message}");
    }
}

// ── Rendering ────────────────────────────────────────────────────────────

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "Tú",
        Role::Assistant => "NextGen",
    }
}

fn format_message(index: usize, message: &Message) -> String {
    let time = message.timestamp.with_timezone(&Local).format("%H:%M");
    let suffix = match message.status {
        MessageStatus::Sending => " …",
        MessageStatus::Sent => "",
        MessageStatus::Error => " (interrumpido)",
    };
    format!(
        "  {:>2}. [{}] {}: {}{}",
        index + 1,
        time,
        role_label(message.role),
        message.content,
        suffix
    )
}

fn format_conversation_line(index: usize, conversation: &Conversation, active: bool) -> String {
    let marker = if active { "*" } else { " " };
    let updated = conversation
        .last_updated
        .with_timezone(&Local)
        .format("%d/%m/%Y %H:%M");
    let short_id: String = conversation.id.chars().take(8).collect();
    format!(
        "{marker}{:>3}. {}  ({} mensajes, {})  [{}]",
        index + 1,
        conversation.title,
        conversation.messages.len(),
        updated,
        short_id
    )
}

fn print_conversation(conversation: &Conversation) {
    println!("── {} ──", conversation.title);
    for (index, message) in conversation.messages.iter().enumerate() {
        println!("{}", format_message(index, message));
    }
}

async fn print_conversation_list(store: &ConversationStore, conversations: &[Conversation]) {
    if conversations.is_empty() {
        println!("No hay conversaciones. Escribe /new para empezar una.");
        return;
    }
    let active = store.active_id().await;
    for (index, conversation) in conversations.iter().enumerate() {
        let is_active = active.as_deref() == Some(conversation.id.as_str());
        println!("{}", format_conversation_line(index, conversation, is_active));
    }
}

fn print_prompt() {
    print!("{PROMPT}");
    let _ = std::io::stdout().flush();
}

/// Render reply progress as it arrives from the store.
async fn render_events(mut events: broadcast::Receiver<StoreEvent>) {
    loop {
        match events.recv().await {
            Ok(StoreEvent::ReplyProgress { content, .. }) => {
                print!("\r\x1b[2KNextGen: {content}");
                let _ = std::io::stdout().flush();
            }
            Ok(StoreEvent::ReplyFinalized { message, .. }) => {
                println!("\r\x1b[2KNextGen: {}", message.content);
                print_prompt();
            }
            Ok(StoreEvent::ReplyCancelled { .. }) => {
                println!("\r\x1b[2K(respuesta detenida)");
                print_prompt();
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!("Renderer skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

// ── Actions ──────────────────────────────────────────────────────────────

async fn require_active(store: &ConversationStore) -> Option<Conversation> {
    let active = store.active_conversation().await;
    if active.is_none() {
        println!("No hay una conversación activa. Usa /new o /open <n>.");
    }
    active
}

async fn resolve(store: &ConversationStore, reference: &str) -> Option<String> {
    let conversations = store.conversations().await;
    let resolved = resolve_conversation(&conversations, reference);
    if resolved.is_none() {
        println!("No se encontró la conversación \"{reference}\".");
    }
    resolved
}

async fn send_message(store: &ConversationStore, text: &str) -> Result<()> {
    let conversation = match store.active_conversation().await {
        Some(conversation) => conversation,
        None => {
            let created = store.create_conversation().await;
            println!("── {} ──", created.title);
            created
        }
    };

    match store.append_user_message(&conversation.id, text).await {
        Ok(_) => Ok(()),
        Err(ChatError::ReplyInProgress(_)) => {
            println!("Espera a que termine la respuesta o usa /stop.");
            Ok(())
        }
        Err(ChatError::InvalidArgument(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Apply one line of input. Returns `false` when the user asked to quit.
async fn dispatch(
    store: &ConversationStore,
    clipboard: &mut SystemClipboard,
    line: &str,
) -> Result<bool> {
    match handle_command(line) {
        CommandResult::Quit => return Ok(false),
        CommandResult::Message(text) => println!("{text}"),
        CommandResult::NewConversation => {
            let created = store.create_conversation().await;
            print_conversation(&created);
        }
        CommandResult::ListConversations => {
            let conversations = store.conversations().await;
            print_conversation_list(store, &conversations).await;
        }
        CommandResult::SelectConversation(reference) => {
            if let Some(id) = resolve(store, &reference).await {
                let selected = store.select_conversation(&id).await?;
                print_conversation(&selected);
            }
        }
        CommandResult::RenameConversation(title) => {
            if let Some(active) = require_active(store).await {
                let renamed = store.rename_conversation(&active.id, &title).await?;
                println!("Conversación renombrada a \"{}\".", renamed.title);
            }
        }
        CommandResult::DeleteConversation(reference) => {
            let id = match reference {
                Some(reference) => resolve(store, &reference).await,
                None => require_active(store).await.map(|c| c.id),
            };
            if let Some(id) = id {
                let removed = store.delete_conversation(&id).await?;
                println!("Conversación \"{}\" eliminada.", removed.title);
            }
        }
        CommandResult::SearchConversations(query) => {
            let found = store.search_conversations(&query).await;
            print_conversation_list(store, &found).await;
        }
        CommandResult::ShowConversation => {
            if let Some(active) = require_active(store).await {
                print_conversation(&active);
            }
        }
        CommandResult::Reload => match store.rehydrate().await {
            Ok(count) => println!("{count} conversaciones cargadas."),
            Err(e) => println!("No se pudieron cargar las conversaciones: {e}"),
        },
        CommandResult::CopyMessage(position) => {
            if let Some(active) = require_active(store).await {
                let message = match position {
                    Some(n) => active.messages.get(n - 1),
                    None => active.last_message(),
                };
                match message {
                    Some(message) => {
                        if let Err(e) = store
                            .copy_message(&active.id, &message.id, clipboard)
                            .await
                        {
                            println!("No se pudo copiar: {e}");
                        }
                    }
                    None => println!("No existe ese mensaje."),
                }
            }
        }
        CommandResult::CancelReply => {
            if let Some(active) = require_active(store).await {
                if !store.cancel_reply(&active.id).await? {
                    println!("No hay ninguna respuesta en curso.");
                }
            }
        }
        CommandResult::NotACommand => {
            if !line.trim().is_empty() {
                send_message(store, line).await?;
            }
        }
    }
    Ok(true)
}

/// Interactive loop: one command or message per line until EOF or `/quit`.
pub async fn run_repl(store: ConversationStore) -> Result<()> {
    let renderer = tokio::spawn(render_events(store.subscribe()));

    println!("NextGen · Escribe un mensaje o /help para ver los comandos.");
    let conversations = store.conversations().await;
    if !conversations.is_empty() {
        print_conversation_list(&store, &conversations).await;
    }

    let mut clipboard = SystemClipboard::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_prompt();
    while let Some(line) = lines.next_line().await? {
        match dispatch(&store, &mut clipboard, &line).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => println!("Error: {e}"),
        }
        print_prompt();
    }

    renderer.abort();
    store.persist().await?;
    Ok(())
}

/// Send one message in a new conversation, wait for the reply and print it.
pub async fn run_single_message(store: ConversationStore, text: &str) -> Result<()> {
    let conversation = store.create_conversation().await;
    let sent = store.append_user_message(&conversation.id, text).await?;

    match sent.reply.finished().await {
        ReplyPhase::Finalized { message_id } => {
            let conversation = store.conversation(&conversation.id).await?;
            if let Some(message) = conversation.message(&message_id) {
                println!("{}", message.content);
            }
        }
        phase => anyhow::bail!("reply did not complete: {phase:?}"),
    }
    Ok(())
}
