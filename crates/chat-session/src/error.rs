//! Session error types.

use thiserror::Error;

/// Session coordination error type.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Session store failure
    #[error("Storage error: {0}")]
    Storage(#[from] session_store::StorageError),

    /// Channel refused an operation
    #[error("Transport error: {0}")]
    Transport(#[from] chat_transport::TransportError),
}

/// Result type alias using SessionError.
pub type SessionResult<T> = Result<T, SessionError>;
