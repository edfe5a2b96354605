pub mod config;
pub mod constants;
pub mod conversation;
pub mod error;
pub mod feedback;
pub mod storage;
pub mod store;

// Re-export key types
pub use config::{ChatSettings, Settings, StorageSettings};
pub use conversation::{Conversation, Message, MessageStatus, Role};
pub use error::{ChatError, Result};
pub use feedback::{
    CannedReply, Clipboard, MemoryClipboard, NoticeLevel, Notifier, ReplySource, TracingNotifier,
};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::{ConversationStore, ReplyPhase, ReplyTicket, SentMessage, StoreEvent};
