//! Collaborators the store talks to but does not own: a toast sink, a
//! clipboard, and the source of simulated assistant replies.

use crate::conversation::Conversation;
use crate::error::ChatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Transient user feedback (toasts).
pub trait Notifier: Send + Sync {
    fn notify(&self, level: NoticeLevel, message: &str);
}

/// Default sink: notices only go to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Info => tracing::info!("{}", message),
            NoticeLevel::Warning => tracing::warn!("{}", message),
            NoticeLevel::Error => tracing::error!("{}", message),
        }
    }
}

pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ChatError>;
}

/// Clipboard that keeps the last copied text in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    contents: Option<String>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ChatError> {
        self.contents = Some(text.to_string());
        Ok(())
    }
}

/// Produces the text of the simulated assistant reply to a user message.
pub trait ReplySource: Send + Sync {
    fn reply(&self, conversation: &Conversation, user_text: &str) -> String;
}

/// Always answers with the same text.
#[derive(Debug, Clone)]
pub struct CannedReply(pub String);

impl ReplySource for CannedReply {
    fn reply(&self, _conversation: &Conversation, _user_text: &str) -> String {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_memory_clipboard_keeps_last_text() {
        let mut clipboard = MemoryClipboard::new();
        assert!(clipboard.contents().is_none());
        clipboard.write_text("uno").unwrap();
        clipboard.write_text("dos").unwrap();
        assert_eq!(clipboard.contents(), Some("dos"));
    }

    #[test]
    fn test_canned_reply_ignores_input() {
        let conv = Conversation::new("c", "t", "w", Utc::now());
        let source = CannedReply("Gracias".to_string());
        assert_eq!(source.reply(&conv, "anything"), "Gracias");
    }
}
