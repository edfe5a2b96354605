//! Local key-value storage for the conversation collection.
//!
//! The store only ever needs a single key holding a text blob, so the seam is
//! a minimal string-to-string map. [`MemoryStore`] backs tests and ephemeral
//! sessions; [`FileStore`] keeps one JSON file per key on disk.

pub mod snapshot;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::constants::storage::FILE_EXTENSION;
use crate::error::ChatError;

pub use snapshot::{decode_snapshot, encode_snapshot, Snapshot};

/// String key-value storage, the equivalent of browser local storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ChatError>;

    fn set(&self, key: &str, value: &str) -> Result<(), ChatError>;

    fn remove(&self, key: &str) -> Result<(), ChatError>;
}

/// In-process store. Contents are lost when it is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with one entry.
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::new();
        if let Ok(mut entries) = store.entries.lock() {
            entries.insert(key.into(), value.into());
        }
        store
    }

    fn entries(
        &self,
        key: &str,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, ChatError> {
        self.entries
            .lock()
            .map_err(|_| ChatError::storage(key, "memory store lock poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ChatError> {
        Ok(self.entries(key)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ChatError> {
        self.entries(key)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ChatError> {
        self.entries(key)?.remove(key);
        Ok(())
    }
}

/// Directory-backed store: `<dir>/<key>.json`, written atomically.
#[derive(Debug, Clone)]
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `base_dir`, creating the directory if needed.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, ChatError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).map_err(|e| {
            ChatError::storage(
                base_dir.display().to_string(),
                format!("Failed to create data directory: {}", e),
            )
        })?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf, ChatError> {
        if key.is_empty() || key.contains('/') || key.contains('\\') || key.starts_with('.') {
            return Err(ChatError::InvalidArgument(format!(
                "storage key {:?} is not a plain file name",
                key
            )));
        }
        Ok(self.base_dir.join(format!("{}.{}", key, FILE_EXTENSION)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, ChatError> {
        let path = self.entry_path(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => Err(
                ChatError::Deserialization(format!("{} is not valid UTF-8", path.display())),
            ),
            Err(e) => Err(ChatError::storage(
                key,
                format!("Failed to read {}: {}", path.display(), e),
            )),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ChatError> {
        let path = self.entry_path(key)?;
        let tmp_path = path.with_extension(format!("{}.tmp", FILE_EXTENSION));

        fs::write(&tmp_path, value).map_err(|e| {
            ChatError::storage(key, format!("Failed to write temporary file: {}", e))
        })?;

        fs::rename(&tmp_path, &path).map_err(|e| {
            ChatError::storage(key, format!("Failed to rename temporary file: {}", e))
        })?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ChatError> {
        let path = self.entry_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ChatError::storage(key, format!("Failed to delete: {}", e))),
        }
    }
}
