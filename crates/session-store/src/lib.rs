//! Persisted session state for the chatline client.
//!
//! This crate provides:
//! - The [`KeyValueStore`] collaborator (string keys, string values)
//! - **File**: a JSON file written atomically, for real clients
//! - **Memory**: a process-local map, for tests and throwaway sessions
//! - [`SessionStore`], the typed `load`/`save`/`clear` contract on top

mod file;
mod keys;
mod memory;
mod session;
mod traits;

pub use file::FileStore;
pub use keys::StorageKeys;
pub use memory::MemoryStore;
pub use session::{Session, SessionStore};
pub use traits::KeyValueStore;

use std::path::Path;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific storage error
    #[error("Platform storage error: {0}")]
    Platform(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Encoding(err.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Create the file-backed store at `path`.
pub fn create_store(path: &Path) -> StorageResult<Box<dyn KeyValueStore>> {
    let store = FileStore::open(path)?;
    Ok(Box::new(store))
}

/// Create a [`SessionStore`] persisted at `path`.
pub fn create_session_store(path: &Path) -> StorageResult<SessionStore> {
    let storage = create_store(path)?;
    Ok(SessionStore::new(storage))
}
