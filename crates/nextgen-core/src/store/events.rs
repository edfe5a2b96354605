use crate::conversation::{Conversation, Message};

/// Changes broadcast to UI subscribers, in the order they were applied.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    ConversationCreated(Conversation),
    ConversationSelected { conversation_id: String },
    ConversationRenamed { conversation_id: String, title: String },
    ConversationDeleted { conversation_id: String },
    MessageAppended { conversation_id: String, message: Message },
    /// The placeholder's content after one more revealed word.
    ReplyProgress {
        conversation_id: String,
        placeholder_id: String,
        content: String,
    },
    ReplyFinalized {
        conversation_id: String,
        placeholder_id: String,
        message: Message,
    },
    ReplyCancelled {
        conversation_id: String,
        placeholder_id: String,
    },
    Rehydrated { conversations: usize },
}

impl StoreEvent {
    /// Conversation this event belongs to, if any.
    pub fn conversation_id(&self) -> Option<&str> {
        match self {
            Self::ConversationCreated(conversation) => Some(&conversation.id),
            Self::ConversationSelected { conversation_id }
            | Self::ConversationRenamed { conversation_id, .. }
            | Self::ConversationDeleted { conversation_id }
            | Self::MessageAppended { conversation_id, .. }
            | Self::ReplyProgress { conversation_id, .. }
            | Self::ReplyFinalized { conversation_id, .. }
            | Self::ReplyCancelled { conversation_id, .. } => Some(conversation_id),
            Self::Rehydrated { .. } => None,
        }
    }
}
