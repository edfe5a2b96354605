use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Failed to deserialize stored conversations: {0}")]
    Deserialization(String),

    #[error("Conversation {0} already has a reply in progress")]
    ReplyInProgress(String),

    #[error("Storage error: {key}: {message}")]
    Storage { key: String, message: String },

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ChatError {
    pub fn storage(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn not_found_conversation(id: &str) -> Self {
        Self::NotFound(format!("conversation {id}"))
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
