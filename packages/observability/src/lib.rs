//! # Observability
//!
//! Centralized logging setup for the chatline workspace.
//!
//! Crates are **log producers** only. They use the standard `tracing` macros
//! and never configure sinks themselves. The binary calls
//! [`init_with_config`] once at startup.
//!
//! ## File sink
//!
//! Structured JSONL is appended to a single file, by default
//! `~/.chatline/logs/client.jsonl`:
//!
//! - `tail -f ~/.chatline/logs/client.jsonl | jq` for pretty JSON
//! - `lnav ~/.chatline/logs/client.jsonl` for interactive exploration
//!
//! ## Usage
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "cli".into(),
//!     default_level: "debug".into(),
//!     also_stderr: true,
//!     ..Default::default()
//! });
//! tracing::info!("ready");
//! ```

mod file_sink;
mod json_layer;

use std::path::PathBuf;

pub use file_sink::{default_log_path, CentralLogWriter};
pub use json_layer::{JsonLayer, LogEntry};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service (e.g., "cli", "chat").
    /// Included in every log line for filtering.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// Optional custom log file path.
    /// Defaults to `~/.chatline/logs/client.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Write JSONL to the log file.
    pub file_sink: bool,

    /// Also emit compact logs to stderr for immediate feedback.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            file_sink: true,
            also_stderr: false,
        }
    }
}

/// Initialize logging with custom configuration.
///
/// Falls back to a stderr-only subscriber when the log file cannot be
/// opened, so a read-only home directory never stops the client.
pub fn init_with_config(config: LogConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Layer};

    let env_filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.default_level))
    };

    let log_path = config.log_path.clone().or_else(default_log_path);

    let (json_layer, open_error) = match (config.file_sink, log_path.as_ref()) {
        (true, Some(path)) => match CentralLogWriter::new(path) {
            Ok(writer) => (
                Some(JsonLayer::new(config.service_name.clone(), writer)),
                None,
            ),
            Err(e) => (None, Some(format!("{}: {}", path.display(), e))),
        },
        _ => (None, None),
    };

    // Without a file sink stderr is the only place logs can go.
    let stderr_enabled = config.also_stderr || json_layer.is_none();
    let stderr_layer = stderr_enabled.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(std::io::stderr)
            .with_filter(env_filter())
    });

    let result = tracing_subscriber::registry()
        .with(json_layer.map(|l| l.with_filter(env_filter())))
        .with(stderr_layer)
        .try_init();

    if result.is_err() {
        // A subscriber is already installed (tests, embedding).
        return;
    }

    if let Some(error) = open_error {
        tracing::warn!(error = %error, "log file unavailable, logging to stderr only");
    } else if let Some(path) = log_path.filter(|_| config.file_sink) {
        tracing::debug!(log_path = %path.display(), service = %config.service_name, "observability initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.service_name, "unknown");
        assert_eq!(config.default_level, "info");
        assert!(config.log_path.is_none());
        assert!(config.file_sink);
        assert!(!config.also_stderr);
    }
}
