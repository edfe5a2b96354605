use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::constants::storage::SNAPSHOT_VERSION;
use crate::conversation::Conversation;
use crate::error::ChatError;

/// Persisted form of the whole conversation collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub version: u32,
    pub conversations: Vec<Conversation>,
}

impl Snapshot {
    pub fn new(conversations: Vec<Conversation>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            conversations,
        }
    }
}

/// Serialize a collection into the current envelope format.
pub fn encode_snapshot(conversations: &[Conversation]) -> Result<String, ChatError> {
    #[derive(Serialize)]
    struct Envelope<'a> {
        version: u32,
        conversations: &'a [Conversation],
    }

    serde_json::to_string(&Envelope {
        version: SNAPSHOT_VERSION,
        conversations,
    })
    .map_err(ChatError::from)
}

/// Parse stored text back into a snapshot.
///
/// Accepts the current envelope and the unversioned layout (a bare array of
/// conversations), which is migrated as version 0. Anything else, including
/// envelopes from a newer version, is a deserialization error.
pub fn decode_snapshot(text: &str) -> Result<Snapshot, ChatError> {
    let value: Value = serde_json::from_str(text).map_err(deserialization)?;

    let mut snapshot = match value {
        Value::Array(_) => {
            let conversations: Vec<Conversation> =
                serde_json::from_value(value).map_err(deserialization)?;
            tracing::debug!("Migrating {} conversations from unversioned layout", conversations.len());
            Snapshot::new(conversations)
        }
        Value::Object(ref fields) => {
            let version = fields
                .get("version")
                .and_then(Value::as_u64)
                .ok_or_else(|| ChatError::Deserialization("missing snapshot version".to_string()))?;
            if version > u64::from(SNAPSHOT_VERSION) {
                return Err(ChatError::Deserialization(format!(
                    "snapshot version {} is newer than supported version {}",
                    version, SNAPSHOT_VERSION
                )));
            }
            let mut snapshot: Snapshot = serde_json::from_value(value).map_err(deserialization)?;
            snapshot.version = SNAPSHOT_VERSION;
            snapshot
        }
        other => {
            return Err(ChatError::Deserialization(format!(
                "expected an object or array, found {}",
                json_kind(&other)
            )))
        }
    };

    validate(&mut snapshot.conversations)?;
    Ok(snapshot)
}

/// Reject duplicate identities and repair `last_updated` lagging behind its
/// own messages.
fn validate(conversations: &mut [Conversation]) -> Result<(), ChatError> {
    let mut conversation_ids = HashSet::new();
    for conversation in conversations.iter_mut() {
        if !conversation_ids.insert(conversation.id.clone()) {
            return Err(ChatError::Deserialization(format!(
                "duplicate conversation id {}",
                conversation.id
            )));
        }

        let mut message_ids = HashSet::new();
        for message in &conversation.messages {
            if !message_ids.insert(message.id.as_str()) {
                return Err(ChatError::Deserialization(format!(
                    "duplicate message id {} in conversation {}",
                    message.id, conversation.id
                )));
            }
        }

        let newest = conversation.newest_timestamp();
        if conversation.last_updated < newest {
            tracing::debug!("Repairing lastUpdated of conversation {}", conversation.id);
            conversation.touch(newest);
        }
    }
    Ok(())
}

fn deserialization(err: serde_json::Error) -> ChatError {
    ChatError::Deserialization(err.to_string())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
