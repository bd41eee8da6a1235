//! Protocol error types.

use thiserror::Error;

/// Errors raised while decoding frames.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Not JSON, or JSON of the wrong shape
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON object without a `type` discriminator
    #[error("Frame has no type")]
    MissingType,

    /// Known frame type whose payload is missing or malformed
    #[error("Malformed {kind} frame: {reason}")]
    Malformed { kind: String, reason: String },
}

/// Result type alias using ProtocolError.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
