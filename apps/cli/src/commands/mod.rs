//! CLI command implementations.

mod auth;
mod chat;
mod users;

pub use auth::{login, logout, register, status};
pub use chat::chat;
pub use users::users;

use anyhow::{Context as _, Result};
use chat_config_and_utils::{Config, Paths};
use chat_rest::RestClient;
use session_store::{create_session_store, Session, SessionStore};
use std::io::{self, Write};

/// Resolved paths and configuration shared by every command.
pub struct Context {
    pub paths: Paths,
    pub config: Config,
}

impl Context {
    pub fn load(paths: Paths) -> Result<Self> {
        let config = Config::load(&paths).context("failed to load configuration")?;
        Ok(Self { paths, config })
    }

    pub fn session_store(&self) -> Result<SessionStore> {
        create_session_store(&self.paths.session_file())
            .with_context(|| format!("failed to open {}", self.paths.session_file().display()))
    }

    pub fn rest_client(&self) -> Result<RestClient> {
        Ok(RestClient::from_config(&self.config)?)
    }

    /// The stored session, or an error telling the user to log in.
    pub fn require_session(&self, store: &SessionStore) -> Result<Session> {
        store
            .load()?
            .ok_or_else(|| anyhow::anyhow!("Not logged in. Run 'chatline login' first"))
    }
}

/// Prompt for a username and a hidden password.
fn prompt_credentials() -> Result<(String, String)> {
    print!("Username: ");
    io::stdout().flush()?;
    let mut username = String::new();
    io::stdin().read_line(&mut username)?;
    let username = username.trim().to_string();

    if username.is_empty() {
        anyhow::bail!("Username is required");
    }

    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        anyhow::bail!("Password is required");
    }

    Ok((username, password))
}
