use nextgen_core::Conversation;

/// Result of processing one line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Display a message to the user.
    Message(String),
    /// Quit the application.
    Quit,
    /// Start a fresh conversation.
    NewConversation,
    /// List conversations, newest first.
    ListConversations,
    /// Switch to a conversation by list number or id prefix.
    SelectConversation(String),
    /// Rename the active conversation.
    RenameConversation(String),
    /// Delete a conversation by list number or id prefix (active if empty).
    DeleteConversation(Option<String>),
    /// Search conversation titles.
    SearchConversations(String),
    /// Copy a message of the active conversation (last one if `None`).
    CopyMessage(Option<usize>),
    /// Stop the reply being revealed in the active conversation.
    CancelReply,
    /// Print the active conversation.
    ShowConversation,
    /// Reload conversations from storage.
    Reload,
    /// Not a command - send as a chat message.
    NotACommand,
}

pub fn handle_command(input: &str) -> CommandResult {
    let input = input.trim();
    let parts: Vec<&str> = input.splitn(2, ' ').collect();
    let cmd = parts[0];
    let arg = parts.get(1).map(|s| s.trim()).unwrap_or("");

    match cmd {
        "/help" | "/h" => show_help(),
        "/exit" | "/quit" | "/q" => CommandResult::Quit,

        // Conversation commands
        "/new" => CommandResult::NewConversation,
        "/list" | "/conversations" | "/history" => CommandResult::ListConversations,
        "/open" | "/select" => {
            if arg.is_empty() {
                CommandResult::Message("Uso: /open <número|id>".into())
            } else {
                CommandResult::SelectConversation(arg.to_string())
            }
        }
        "/rename" | "/title" => {
            if arg.is_empty() {
                CommandResult::Message("Uso: /rename <nuevo título>".into())
            } else {
                CommandResult::RenameConversation(arg.to_string())
            }
        }
        "/delete" | "/rm" => {
            if arg.is_empty() {
                CommandResult::DeleteConversation(None)
            } else {
                CommandResult::DeleteConversation(Some(arg.to_string()))
            }
        }
        "/search" => {
            if arg.is_empty() {
                CommandResult::Message("Uso: /search <texto>".into())
            } else {
                CommandResult::SearchConversations(arg.to_string())
            }
        }
        "/show" => CommandResult::ShowConversation,
        "/reload" => CommandResult::Reload,

        // Message commands
        "/copy" => {
            if arg.is_empty() {
                CommandResult::CopyMessage(None)
            } else {
                match arg.parse::<usize>() {
                    Ok(n) if n > 0 => CommandResult::CopyMessage(Some(n)),
                    _ => CommandResult::Message(
                        "Uso: /copy [número de mensaje, empezando en 1]".into(),
                    ),
                }
            }
        }
        "/stop" | "/cancel" => CommandResult::CancelReply,

        "/version" => CommandResult::Message(format!("NextGen CLI v{}", env!("CARGO_PKG_VERSION"))),

        // Unknown command
        _ => {
            if input.starts_with('/') {
                CommandResult::Message(format!("Comando desconocido: {cmd}. Escribe /help para ver los comandos."))
            } else {
                CommandResult::NotACommand
            }
        }
    }
}

fn show_help() -> CommandResult {
    let help_text = "\
╭─ Comandos de NextGen ──────────────────────────────────────────╮

  CONVERSACIONES
    /new                      Nueva conversación
    /list, /history           Listar conversaciones (recientes primero)
    /open <n|id>              Abrir una conversación
    /rename <título>          Renombrar la conversación activa
    /delete [n|id]            Eliminar una conversación (activa por defecto)
    /search <texto>           Buscar por título
    /show                     Mostrar la conversación activa
    /reload                   Recargar desde el almacenamiento

  MENSAJES
    <texto>                   Enviar un mensaje al asistente
    /copy [n]                 Copiar un mensaje al portapapeles
    /stop, /cancel            Detener la respuesta en curso

  OTROS
    /help, /h                 Mostrar esta ayuda
    /version                  Mostrar la versión
    /exit, /quit, /q          Salir

╰────────────────────────────────────────────────────────────────╯";

    CommandResult::Message(help_text.into())
}

/// Resolve a user reference to a conversation id.
///
/// `reference` is either a 1-based position in `conversations` (as printed by
/// `/list`) or an id prefix that matches exactly one conversation.
pub fn resolve_conversation(conversations: &[Conversation], reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }

    if let Ok(n) = reference.parse::<usize>() {
        if n >= 1 && n <= conversations.len() {
            return Some(conversations[n - 1].id.clone());
        }
    }

    if let Some(exact) = conversations.iter().find(|c| c.id == reference) {
        return Some(exact.id.clone());
    }

    let mut matches = conversations.iter().filter(|c| c.id.starts_with(reference));
    match (matches.next(), matches.next()) {
        (Some(only), None) => Some(only.id.clone()),
        _ => None,
    }
}
