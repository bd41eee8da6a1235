//! Core types, configuration, and utilities for the chatline client.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, ReconnectSettings, DEFAULT_API_URL, DEFAULT_LOG_LEVEL, DEFAULT_WS_URL,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, init_logging_for_service, parse_level};
pub use paths::Paths;
