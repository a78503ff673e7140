//! Key-value persistence for chat state.
//!
//! The session store only talks to a [`KeyValueStore`]: string keys, string values,
//! `get`/`set`/`remove`. [`MemoryStore`] backs tests; [`FileStore`] keeps the values in a
//! JSON object file so a session survives restarts.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage file {} is locked by another process", .0.display())]
    Locked(std::path::PathBuf),
}

/// Passive string key-value store (browser local storage equivalent).
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, or None if absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
