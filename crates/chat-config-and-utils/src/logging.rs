//! Logging initialization for the client.
//!
//! Thin wrapper over the observability package. Every process writes JSONL
//! to `~/.chatline/logs/client.jsonl`; stderr output is opt-in through
//! `CHATLINE_LOG_STDERR` so it does not interleave with interactive output.

use observability::LogConfig;
use std::path::PathBuf;

/// Initialize logging for the CLI.
pub fn init_logging(level: &str, log_path: Option<PathBuf>) {
    init_logging_for_service("cli", level, log_path);
}

/// Initialize logging with a custom service name.
pub fn init_logging_for_service(service_name: &str, level: &str, log_path: Option<PathBuf>) {
    let also_stderr = std::env::var("CHATLINE_LOG_STDERR")
        .map(|raw| env_flag(&raw))
        .unwrap_or(false);

    observability::init_with_config(LogConfig {
        service_name: service_name.into(),
        default_level: parse_level(level).to_string().to_ascii_lowercase(),
        log_path,
        also_stderr,
        ..Default::default()
    });
}

fn env_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
