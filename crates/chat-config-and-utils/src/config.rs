//! Configuration management for the client.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Default REST base URL of the messaging backend.
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

/// Default authenticated WebSocket endpoint of the messaging backend.
pub const DEFAULT_WS_URL: &str = "ws://localhost:8080/ws/auth";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Reconnect backoff settings for the realtime channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectSettings {
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound for any single retry delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Attempts before giving up. Zero disables reconnection.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_max_attempts() -> u32 {
    5
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Main client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// REST base URL, e.g. `http://localhost:8080/api`.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Authenticated WebSocket endpoint, e.g. `ws://localhost:8080/ws/auth`.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Realtime reconnect policy.
    #[serde(default)]
    pub reconnect: ReconnectSettings,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_ws_url() -> String {
    DEFAULT_WS_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_url: default_api_url(),
            ws_url: default_ws_url(),
            reconnect: ReconnectSettings::default(),
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply `CHATLINE_*` overrides using the given variable lookup.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(log_level) = non_empty("CHATLINE_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Some(api_url) = non_empty("CHATLINE_API_URL") {
            self.api_url = api_url;
        }
        if let Some(ws_url) = non_empty("CHATLINE_WS_URL") {
            self.ws_url = ws_url;
        }
    }

    /// Check that both endpoints parse and use the expected schemes.
    pub fn validate(&self) -> CoreResult<()> {
        let api = self.api_url()?;
        if !matches!(api.scheme(), "http" | "https") {
            return Err(CoreError::Config(format!(
                "api_url must be http(s), got {}",
                api.scheme()
            )));
        }
        let ws = self.ws_url()?;
        if !matches!(ws.scheme(), "ws" | "wss") {
            return Err(CoreError::Config(format!(
                "ws_url must be ws(s), got {}",
                ws.scheme()
            )));
        }
        if self.reconnect.base_delay_ms > self.reconnect.max_delay_ms {
            return Err(CoreError::Config(
                "reconnect.base_delay_ms exceeds reconnect.max_delay_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// The REST base URL as a parsed URL.
    pub fn api_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_url).map_err(CoreError::from)
    }

    /// The realtime endpoint as a parsed URL.
    pub fn ws_url(&self) -> CoreResult<Url> {
        Url::parse(&self.ws_url).map_err(CoreError::from)
    }

    /// Base URL for pending login/registration sockets (`.../ws`).
    ///
    /// Derived from `ws_url` by dropping its last path segment, so
    /// `ws://host/ws/auth` becomes `ws://host/ws`.
    pub fn ws_base_url(&self) -> CoreResult<Url> {
        let mut url = self.ws_url()?;
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().pop();
        }
        Ok(url)
    }
}
