//! Transport error types.

use crate::ChannelState;
use thiserror::Error;

/// Transport error type.
#[derive(Error, Debug)]
pub enum TransportError {
    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// No token available to authenticate with
    #[error("No session token; log in first")]
    MissingToken,

    /// Operation not allowed in the channel's current state
    #[error("Channel is {state:?}, cannot {operation}")]
    InvalidState {
        state: ChannelState,
        operation: &'static str,
    },

    /// Socket task is gone
    #[error("Not connected")]
    NotConnected,

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using TransportError.
pub type TransportResult<T> = Result<T, TransportError>;
