use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::ids;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Delivery state of a message. Only `Sending` messages may change content.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sending,
    Sent,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub status: MessageStatus,
}

impl Message {
    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: new_message_id(ids::USER_PREFIX),
            role: Role::User,
            content: content.into(),
            timestamp,
            status: MessageStatus::Sent,
        }
    }

    pub fn assistant(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: new_message_id(ids::ASSISTANT_PREFIX),
            role: Role::Assistant,
            content: content.into(),
            timestamp,
            status: MessageStatus::Sent,
        }
    }

    pub fn welcome(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: new_message_id(ids::WELCOME_PREFIX),
            ..Self::assistant(content, timestamp)
        }
    }

    /// Empty assistant message shown while a reply is being revealed.
    pub fn placeholder(timestamp: DateTime<Utc>) -> Self {
        Self {
            id: new_message_id(ids::PLACEHOLDER_PREFIX),
            role: Role::Assistant,
            content: String::new(),
            timestamp,
            status: MessageStatus::Sending,
        }
    }

    pub fn is_sending(&self) -> bool {
        self.status == MessageStatus::Sending
    }
}

pub(crate) fn new_message_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_role_and_status() {
        let now = Utc::now();
        let user = Message::user("Hola", now);
        assert_eq!(user.role, Role::User);
        assert_eq!(user.status, MessageStatus::Sent);
        assert!(user.id.starts_with("user-"));

        let welcome = Message::welcome("Bienvenido", now);
        assert_eq!(welcome.role, Role::Assistant);
        assert!(welcome.id.starts_with("welcome-"));

        let placeholder = Message::placeholder(now);
        assert!(placeholder.is_sending());
        assert!(placeholder.content.is_empty());
        assert!(placeholder.id.starts_with("typing-"));
    }

    #[test]
    fn test_ids_are_unique() {
        let now = Utc::now();
        let a = Message::assistant("x", now);
        let b = Message::assistant("x", now);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_enums_serialize_lowercase() {
        let msg = Message::placeholder(Utc::now());
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["status"], "sending");
    }
}
