//! The conversation store: owns the conversation collection and the active
//! conversation, and is the only place they are mutated.
//!
//! Every mutating operation saves the whole collection to the key-value store
//! once the mutation is complete. Write failures are logged and forwarded to
//! the [`Notifier`]; they never fail the operation itself.

mod events;
mod reveal;

pub use events::StoreEvent;
pub use reveal::{reveal_frames, ReplyPhase, ReplyTicket};

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::config::{ChatSettings, Settings};
use crate::constants::chat::{COPIED_NOTICE, EVENT_CHANNEL_CAPACITY};
use crate::constants::storage::CONVERSATIONS_KEY;
use crate::conversation::{sort_for_display, Conversation, Message, MessageStatus};
use crate::error::{ChatError, Result};
use crate::feedback::{
    CannedReply, Clipboard, NoticeLevel, Notifier, ReplySource, TracingNotifier,
};
use crate::storage::{decode_snapshot, encode_snapshot, KeyValueStore};

use reveal::RevealTask;

/// Outcome of [`ConversationStore::append_user_message`].
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message: Message,
    pub reply: ReplyTicket,
}

#[derive(Default)]
pub(crate) struct StoreState {
    /// Insertion order; display order is computed on read.
    conversations: Vec<Conversation>,
    active_id: Option<String>,
    reveals: HashMap<String, RevealTask>,
}

impl StoreState {
    pub(crate) fn conversation(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub(crate) fn conversation_mut(&mut self, id: &str) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    fn require(&self, id: &str) -> Result<&Conversation> {
        self.conversation(id)
            .ok_or_else(|| ChatError::not_found_conversation(id))
    }

    fn require_mut(&mut self, id: &str) -> Result<&mut Conversation> {
        self.conversation_mut(id)
            .ok_or_else(|| ChatError::not_found_conversation(id))
    }

    fn has_reply_in_flight(&self, id: &str) -> bool {
        self.reveals.contains_key(id)
            || self
                .conversation(id)
                .is_some_and(|c| c.sending_message().is_some())
    }

    fn fresh_conversation_id(&self) -> String {
        loop {
            let id = uuid::Uuid::new_v4().to_string();
            if self.conversation(&id).is_none() {
                return id;
            }
        }
    }

    /// Abort the reveal running on `id` and fail its placeholder. Returns
    /// the placeholder id when a reveal was in flight.
    fn cancel_reveal(&mut self, id: &str) -> Option<String> {
        let task = self.reveals.remove(id)?;
        let placeholder_id = task.placeholder_id.clone();
        task.cancel();
        if let Some(placeholder) = self
            .conversation_mut(id)
            .and_then(|c| c.message_mut(&placeholder_id))
            .filter(|m| m.is_sending())
        {
            placeholder.status = MessageStatus::Error;
        }
        Some(placeholder_id)
    }
}

fn check_reply_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(ChatError::InvalidArgument("reply text is empty".to_string()));
    }
    Ok(())
}

/// Everything a reveal task needs besides the state itself.
#[derive(Clone)]
pub(crate) struct Shared {
    pub(crate) settings: ChatSettings,
    key: String,
    storage: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    replies: Arc<dyn ReplySource>,
    events: broadcast::Sender<StoreEvent>,
}

impl Shared {
    pub(crate) fn emit(&self, event: StoreEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn persist(&self, state: &StoreState) -> Result<()> {
        let text = encode_snapshot(&state.conversations)?;
        self.storage.set(&self.key, &text)
    }

    pub(crate) fn persist_or_report(&self, state: &StoreState) {
        if let Err(e) = self.persist(state) {
            warn!("Failed to save conversations: {}", e);
            self.notifier.notify(
                NoticeLevel::Error,
                &format!("No se pudieron guardar las conversaciones: {e}"),
            );
        }
    }
}

/// Cheap-clone handle to the shared conversation store.
#[derive(Clone)]
pub struct ConversationStore {
    state: Arc<Mutex<StoreState>>,
    shared: Shared,
}

impl ConversationStore {
    pub fn new(storage: Arc<dyn KeyValueStore>, settings: ChatSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let replies = Arc::new(CannedReply(settings.canned_reply.clone()));
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            shared: Shared {
                settings,
                key: CONVERSATIONS_KEY.to_string(),
                storage,
                notifier: Arc::new(TracingNotifier),
                replies,
                events,
            },
        }
    }

    /// Store configured from full settings, including the storage key.
    pub fn from_settings(storage: Arc<dyn KeyValueStore>, settings: &Settings) -> Self {
        Self::new(storage, settings.chat.clone()).with_key(settings.storage.conversations_key.clone())
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.shared.key = key.into();
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.shared.notifier = notifier;
        self
    }

    pub fn with_reply_source(mut self, replies: Arc<dyn ReplySource>) -> Self {
        self.shared.replies = replies;
        self
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.shared.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.shared.events.subscribe()
    }

    // ── Queries ──────────────────────────────────────────────────────────

    /// All conversations, most recently updated first.
    pub async fn conversations(&self) -> Vec<Conversation> {
        let state = self.state.lock().await;
        let mut list = state.conversations.clone();
        sort_for_display(&mut list);
        list
    }

    pub async fn conversation(&self, id: &str) -> Result<Conversation> {
        let state = self.state.lock().await;
        state.require(id).cloned()
    }

    pub async fn active_id(&self) -> Option<String> {
        self.state.lock().await.active_id.clone()
    }

    pub async fn active_conversation(&self) -> Option<Conversation> {
        let state = self.state.lock().await;
        let id = state.active_id.as_deref()?;
        state.conversation(id).cloned()
    }

    /// Case-insensitive title search, in display order.
    pub async fn search_conversations(&self, query: &str) -> Vec<Conversation> {
        let query = query.trim().to_lowercase();
        let mut matches = self.conversations().await;
        matches.retain(|c| c.title.to_lowercase().contains(&query));
        matches
    }

    pub async fn reply_in_progress(&self, id: &str) -> bool {
        self.state.lock().await.has_reply_in_flight(id)
    }

    // ── Mutations ────────────────────────────────────────────────────────

    /// Create a conversation seeded with the welcome message and make it
    /// active.
    pub async fn create_conversation(&self) -> Conversation {
        let mut state = self.state.lock().await;
        let id = state.fresh_conversation_id();
        let title = format!(
            "{} {}",
            self.shared.settings.title_prefix,
            state.conversations.len() + 1
        );
        let conversation = Conversation::new(
            id.clone(),
            title,
            self.shared.settings.welcome_message.clone(),
            Utc::now(),
        );
        state.conversations.push(conversation.clone());
        self.activate(&mut state, &id);
        self.shared.persist_or_report(&state);
        drop(state);

        info!("Created conversation {}", id);
        self.shared
            .emit(StoreEvent::ConversationCreated(conversation.clone()));
        conversation
    }

    /// Make `id` the active conversation. A reveal running on the previously
    /// active conversation is cancelled.
    pub async fn select_conversation(&self, id: &str) -> Result<Conversation> {
        let mut state = self.state.lock().await;
        let conversation = state.require(id)?.clone();
        if self.activate(&mut state, id) {
            self.shared.persist_or_report(&state);
        }
        drop(state);

        debug!("Selected conversation {}", id);
        self.shared.emit(StoreEvent::ConversationSelected {
            conversation_id: id.to_string(),
        });
        Ok(conversation)
    }

    /// Append a user message and start the simulated assistant reply.
    pub async fn append_user_message(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Result<SentMessage> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::InvalidArgument(
                "message text is empty".to_string(),
            ));
        }

        let mut state = self.state.lock().await;
        state.require(conversation_id)?;
        if state.has_reply_in_flight(conversation_id) {
            return Err(ChatError::ReplyInProgress(conversation_id.to_string()));
        }

        // The reply is computed on a draft so a blank reply leaves no user
        // message behind.
        let mut draft = state.require(conversation_id)?.clone();
        let message_id = draft.push(Message::user(text, Utc::now()));
        let reply_text = self.shared.replies.reply(&draft, text);
        check_reply_text(&reply_text)?;
        let message = draft
            .message(&message_id)
            .cloned()
            .ok_or_else(|| ChatError::NotFound(format!("message {message_id}")))?;
        *state.require_mut(conversation_id)? = draft;

        self.shared.emit(StoreEvent::MessageAppended {
            conversation_id: conversation_id.to_string(),
            message: message.clone(),
        });
        let reply = self.start_reply(&mut state, conversation_id, reply_text)?;
        self.shared.persist_or_report(&state);

        Ok(SentMessage { message, reply })
    }

    /// Append a `sending` placeholder and reveal `full_text` into it word by
    /// word, then swap it for a finalized message with a fresh id.
    pub async fn simulate_assistant_reply(
        &self,
        conversation_id: &str,
        full_text: &str,
    ) -> Result<ReplyTicket> {
        check_reply_text(full_text)?;

        let mut state = self.state.lock().await;
        state.require(conversation_id)?;
        if state.has_reply_in_flight(conversation_id) {
            return Err(ChatError::ReplyInProgress(conversation_id.to_string()));
        }

        let ticket = self.start_reply(&mut state, conversation_id, full_text.to_string())?;
        self.shared.persist_or_report(&state);
        Ok(ticket)
    }

    pub async fn rename_conversation(&self, id: &str, title: &str) -> Result<Conversation> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ChatError::InvalidArgument("title is empty".to_string()));
        }

        let mut state = self.state.lock().await;
        let conv = state.require_mut(id)?;
        conv.title = title.to_string();
        conv.touch(Utc::now());
        let renamed = conv.clone();
        self.shared.persist_or_report(&state);
        drop(state);

        self.shared.emit(StoreEvent::ConversationRenamed {
            conversation_id: id.to_string(),
            title: title.to_string(),
        });
        Ok(renamed)
    }

    /// Remove a conversation, cancelling its reveal. Clears the active
    /// reference when it pointed at `id`.
    pub async fn delete_conversation(&self, id: &str) -> Result<Conversation> {
        let mut state = self.state.lock().await;
        let index = state
            .conversations
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| ChatError::not_found_conversation(id))?;

        let cancelled = state.cancel_reveal(id);
        let removed = state.conversations.remove(index);
        if state.active_id.as_deref() == Some(id) {
            state.active_id = None;
        }
        self.shared.persist_or_report(&state);
        drop(state);

        if let Some(placeholder_id) = cancelled {
            self.shared.emit(StoreEvent::ReplyCancelled {
                conversation_id: id.to_string(),
                placeholder_id,
            });
        }
        info!("Deleted conversation {}", id);
        self.shared.emit(StoreEvent::ConversationDeleted {
            conversation_id: id.to_string(),
        });
        Ok(removed)
    }

    /// Stop the reply revealing in `id`. Returns whether one was running.
    pub async fn cancel_reply(&self, id: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        state.require(id)?;
        let Some(placeholder_id) = state.cancel_reveal(id) else {
            return Ok(false);
        };
        self.shared.persist_or_report(&state);
        drop(state);

        self.shared.emit(StoreEvent::ReplyCancelled {
            conversation_id: id.to_string(),
            placeholder_id,
        });
        Ok(true)
    }

    /// Write a message's text to `clipboard` and confirm with a notice.
    pub async fn copy_message(
        &self,
        conversation_id: &str,
        message_id: &str,
        clipboard: &mut dyn Clipboard,
    ) -> Result<()> {
        let content = {
            let state = self.state.lock().await;
            state
                .require(conversation_id)?
                .message(message_id)
                .map(|m| m.content.clone())
                .ok_or_else(|| ChatError::NotFound(format!("message {message_id}")))?
        };

        clipboard.write_text(&content)?;
        self.shared.notifier.notify(NoticeLevel::Info, COPIED_NOTICE);
        Ok(())
    }

    // ── Persistence ──────────────────────────────────────────────────────

    /// Save the whole collection under the store key.
    pub async fn persist(&self) -> Result<()> {
        let state = self.state.lock().await;
        self.shared.persist(&state)
    }

    /// Replace the collection with what is stored under the store key.
    ///
    /// Absent data yields an empty collection. Unreadable or malformed data
    /// also leaves an empty collection, sends a warning notice and returns
    /// the error. Running reveals are cancelled, the active reference is
    /// cleared, and persisted `sending` messages become `error`.
    pub async fn rehydrate(&self) -> Result<usize> {
        let mut state = self.state.lock().await;
        let mut cancelled = Vec::new();
        for (conversation_id, task) in state.reveals.drain() {
            cancelled.push((conversation_id, task.placeholder_id.clone()));
            task.cancel();
        }
        state.active_id = None;
        state.conversations.clear();

        let loaded = self
            .shared
            .storage
            .get(&self.shared.key)
            .and_then(|stored| match stored {
                Some(text) if !text.trim().is_empty() => {
                    decode_snapshot(&text).map(|snapshot| snapshot.conversations)
                }
                _ => Ok(Vec::new()),
            });

        let result = match loaded {
            Ok(mut conversations) => {
                let interrupted: usize =
                    conversations.iter_mut().map(|c| c.fail_sending()).sum();
                if interrupted > 0 {
                    debug!("Marked {} interrupted replies as failed", interrupted);
                }
                state.conversations = conversations;
                Ok(state.conversations.len())
            }
            Err(e) => {
                warn!("Starting with no conversations: {}", e);
                self.shared.notifier.notify(
                    NoticeLevel::Warning,
                    &format!("No se pudieron cargar las conversaciones guardadas: {e}"),
                );
                Err(e)
            }
        };
        let count = state.conversations.len();
        drop(state);

        for (conversation_id, placeholder_id) in cancelled {
            self.shared.emit(StoreEvent::ReplyCancelled {
                conversation_id,
                placeholder_id,
            });
        }
        info!("Rehydrated {} conversations", count);
        self.shared
            .emit(StoreEvent::Rehydrated { conversations: count });
        result
    }

    // ── Internals ────────────────────────────────────────────────────────

    /// Point the active reference at `id`, cancelling the reveal of the
    /// conversation it replaces. Returns true when a reveal was cancelled.
    fn activate(&self, state: &mut StoreState, id: &str) -> bool {
        let previous = state.active_id.replace(id.to_string());
        let Some(previous) = previous.filter(|p| p != id) else {
            return false;
        };
        let Some(placeholder_id) = state.cancel_reveal(&previous) else {
            return false;
        };
        debug!("Cancelled reply in deselected conversation {}", previous);
        self.shared.emit(StoreEvent::ReplyCancelled {
            conversation_id: previous,
            placeholder_id,
        });
        true
    }

    fn start_reply(
        &self,
        state: &mut StoreState,
        conversation_id: &str,
        full_text: String,
    ) -> Result<ReplyTicket> {
        check_reply_text(&full_text)?;
        let conv = state.require_mut(conversation_id)?;
        let placeholder_id = conv.push(Message::placeholder(Utc::now()));
        let placeholder = conv
            .message(&placeholder_id)
            .cloned()
            .ok_or_else(|| ChatError::NotFound(format!("message {placeholder_id}")))?;

        let (task, ticket) = reveal::spawn_reveal(
            &self.state,
            &self.shared,
            conversation_id,
            &placeholder_id,
            full_text,
        );
        state.reveals.insert(conversation_id.to_string(), task);

        debug!("Started reply {} in {}", placeholder_id, conversation_id);
        self.shared.emit(StoreEvent::MessageAppended {
            conversation_id: conversation_id.to_string(),
            message: placeholder,
        });
        Ok(ticket)
    }
}
