//! Conversation and message records.
//!
//! A [`Conversation`] is append-only: messages are kept in insertion order and
//! insertion order is chronological. `last_updated` never moves backwards and
//! is always at least the newest message timestamp.

mod message;

pub use message::{Message, MessageStatus, Role};
pub(crate) use message::new_message_id;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub last_updated: DateTime<Utc>,
}

impl Conversation {
    /// Create a conversation seeded with a welcome assistant message.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        welcome: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            messages: vec![Message::welcome(welcome, now)],
            last_updated: now,
        }
    }

    /// Timestamp to stamp on a new event: `now`, unless the clock is behind
    /// the conversation's own history.
    pub fn clamp_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.max(self.last_updated)
    }

    /// Advance `last_updated`; never moves it backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_updated = self.last_updated.max(now);
    }

    /// Append a message, keeping timestamps chronological. Returns the id.
    pub fn push(&mut self, mut message: Message) -> String {
        debug_assert!(
            self.message(&message.id).is_none(),
            "duplicate message id {}",
            message.id
        );
        message.timestamp = self.clamp_time(message.timestamp);
        self.touch(message.timestamp);
        let id = message.id.clone();
        self.messages.push(message);
        id
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub(crate) fn message_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    /// The message currently being revealed, if any.
    pub fn sending_message(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.is_sending())
    }

    pub fn sending_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_sending()).count()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Swap the placeholder `placeholder_id` for `finalized`, keeping its
    /// position in the sequence. Returns false when the placeholder is gone.
    pub(crate) fn replace_message(&mut self, placeholder_id: &str, mut finalized: Message) -> bool {
        let Some(index) = self.messages.iter().position(|m| m.id == placeholder_id) else {
            return false;
        };
        finalized.timestamp = self.clamp_time(finalized.timestamp);
        self.touch(finalized.timestamp);
        self.messages[index] = finalized;
        true
    }

    /// Mark every in-flight message as failed. Used when no reveal can
    /// resume it.
    pub(crate) fn fail_sending(&mut self) -> usize {
        let mut failed = 0;
        for message in self.messages.iter_mut().filter(|m| m.is_sending()) {
            message.status = MessageStatus::Error;
            failed += 1;
        }
        failed
    }

    /// Newest message timestamp, or `last_updated` for an empty conversation.
    pub fn newest_timestamp(&self) -> DateTime<Utc> {
        self.messages
            .iter()
            .map(|m| m.timestamp)
            .max()
            .unwrap_or(self.last_updated)
    }
}

/// Sort conversations for display: most recently updated first.
pub fn sort_for_display(conversations: &mut [Conversation]) {
    conversations.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn conversation(now: DateTime<Utc>) -> Conversation {
        Conversation::new("c1", "Conversación 1", "Hola", now)
    }

    #[test]
    fn test_new_conversation_has_welcome_message() {
        let now = Utc::now();
        let conv = conversation(now);
        assert_eq!(conv.messages.len(), 1);
        assert_eq!(conv.messages[0].role, Role::Assistant);
        assert_eq!(conv.messages[0].content, "Hola");
        assert_eq!(conv.last_updated, now);
    }

    #[test]
    fn test_push_clamps_backwards_clock() {
        let now = Utc::now();
        let mut conv = conversation(now);
        let earlier = now - Duration::seconds(30);

        conv.push(Message::user("first", earlier));

        let pushed = conv.last_message().unwrap();
        assert_eq!(pushed.timestamp, now);
        assert_eq!(conv.last_updated, now);
        assert!(conv.last_updated >= conv.newest_timestamp());
    }

    #[test]
    fn test_push_advances_last_updated() {
        let now = Utc::now();
        let mut conv = conversation(now);
        let later = now + Duration::seconds(5);

        conv.push(Message::user("hi", later));
        assert_eq!(conv.last_updated, later);
    }

    #[test]
    fn test_replace_message_keeps_position() {
        let now = Utc::now();
        let mut conv = conversation(now);
        let placeholder_id = conv.push(Message::placeholder(now));
        conv.push(Message::user("after", now));

        let finalized = Message::assistant("done", now);
        let finalized_id = finalized.id.clone();
        assert!(conv.replace_message(&placeholder_id, finalized));

        assert_eq!(conv.messages[1].id, finalized_id);
        assert!(conv.message(&placeholder_id).is_none());
        assert!(!conv.replace_message(&placeholder_id, Message::assistant("x", now)));
    }

    #[test]
    fn test_fail_sending_marks_error() {
        let now = Utc::now();
        let mut conv = conversation(now);
        conv.push(Message::placeholder(now));
        assert_eq!(conv.sending_count(), 1);

        assert_eq!(conv.fail_sending(), 1);
        assert_eq!(conv.sending_count(), 0);
        assert_eq!(conv.last_message().unwrap().status, MessageStatus::Error);
    }

    #[test]
    fn test_sort_for_display_newest_first() {
        let now = Utc::now();
        let old = Conversation::new("old", "a", "w", now - Duration::minutes(5));
        let new = Conversation::new("new", "b", "w", now);
        let mut list = vec![old, new];

        sort_for_display(&mut list);
        assert_eq!(list[0].id, "new");
        assert_eq!(list[1].id, "old");
    }

    #[test]
    fn test_serializes_camel_case_last_updated() {
        let conv = conversation(Utc::now());
        let json = serde_json::to_value(&conv).unwrap();
        assert!(json.get("lastUpdated").is_some());
        assert!(json["lastUpdated"].is_string());
    }
}
