//! REST error types.

use thiserror::Error;

/// REST client error type.
#[derive(Error, Debug)]
pub enum RestError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the bearer token
    #[error("Unauthorized")]
    Unauthorized,

    /// Non-2xx response
    #[error("Request failed ({status}): {message}")]
    Status { status: u16, message: String },

    /// Response body did not decode
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Bad base URL
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] chat_config_and_utils::CoreError),

    /// Pending-result socket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Login or registration refused
    #[error("{0}")]
    AuthFailed(String),

    /// Pending socket yielded no result in time
    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),
}

/// Result type alias using RestError.
pub type RestResult<T> = Result<T, RestError>;
