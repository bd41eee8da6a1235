//! Authentication commands.

use super::{prompt_credentials, Context};
use crate::output::{self, OutputFormat};
use anyhow::Result;
use chat_rest::RestError;
use session_store::Session;

/// Log in, reusing the stored token when the backend still accepts it.
pub async fn login(ctx: &Context, format: &OutputFormat) -> Result<()> {
    let store = ctx.session_store()?;
    let rest = ctx.rest_client()?;

    if let Some(token) = store.token()? {
        match rest.users_self(&token).await {
            Ok(user) => {
                let mut session = store.load()?.unwrap_or(Session {
                    token: token.clone(),
                    user_id: user.id,
                    username: None,
                    selected_peer_id: None,
                });
                session.user_id = user.id;
                session.username = Some(user.username.clone());
                store.save(&session)?;
                output::print_success(&format!("Already logged in as {}", user.username), format);
                return Ok(());
            }
            Err(RestError::Unauthorized) => {
                tracing::info!("stored token rejected, clearing session");
                store.clear()?;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let (username, password) = prompt_credentials()?;
    if matches!(format, OutputFormat::Text) {
        println!("Logging in...");
    }

    let outcome = match rest.login(&username, &password).await {
        Ok(outcome) => outcome,
        Err(e) => {
            output::print_error(&format!("Login failed: {}", e), format);
            return Ok(());
        }
    };
    let Some(token) = outcome.token else {
        output::print_error("Login failed: no token received", format);
        return Ok(());
    };

    // The second half of login: resolve the user id for this token.
    store.set_token(&token)?;
    let user = match rest.users_self(&token).await {
        Ok(user) => user,
        Err(e) => {
            store.clear()?;
            output::print_error(&format!("Failed to fetch user information: {}", e), format);
            return Ok(());
        }
    };

    store.save(&Session {
        token,
        user_id: user.id,
        username: Some(username.clone()),
        selected_peer_id: None,
    })?;

    output::print_success(&format!("Logged in as {}", username), format);
    Ok(())
}

/// Create an account.
pub async fn register(ctx: &Context, format: &OutputFormat) -> Result<()> {
    let rest = ctx.rest_client()?;
    let (username, password) = prompt_credentials()?;

    match rest.register(&username, &password).await {
        Ok(outcome) => {
            let message = outcome
                .message
                .unwrap_or_else(|| "Registration successful".to_string());
            output::print_success(
                &format!("{}. Run 'chatline login' to sign in", message.trim_end_matches('.')),
                format,
            );
        }
        Err(e) => output::print_error(&format!("Registration failed: {}", e), format),
    }
    Ok(())
}

/// Clear the stored session.
pub async fn logout(ctx: &Context, format: &OutputFormat) -> Result<()> {
    let store = ctx.session_store()?;
    store.clear()?;
    output::print_success("Logged out successfully", format);
    Ok(())
}

/// Show the stored session and whether the backend accepts it.
pub async fn status(ctx: &Context, format: &OutputFormat) -> Result<()> {
    let store = ctx.session_store()?;
    let Some(session) = store.load()? else {
        match format {
            OutputFormat::Text => println!("Auth:     not logged in"),
            OutputFormat::Json => output::print_json(&serde_json::json!({ "logged_in": false })),
        }
        return Ok(());
    };

    let rest = ctx.rest_client()?;
    let validity = match rest.users_self(&session.token).await {
        Ok(_) => "valid",
        Err(RestError::Unauthorized) => {
            store.clear()?;
            "expired"
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not validate token");
            "unknown"
        }
    };
    let logged_in = validity != "expired";

    match format {
        OutputFormat::Text => {
            output::print_heading("Session");
            output::print_row("Auth", if logged_in { "logged in" } else { "session expired" });
            output::print_row("User ID", &session.user_id.to_string());
            output::print_row("Username", session.username.as_deref().unwrap_or("unknown"));
            output::print_row("Token", validity);
            if let Some(peer) = session.selected_peer_id {
                output::print_row("Open chat", &peer.to_string());
            }
            output::print_row("Server", &ctx.config.api_url);
        }
        OutputFormat::Json => output::print_json(&serde_json::json!({
            "logged_in": logged_in,
            "user_id": session.user_id,
            "username": session.username,
            "token": validity,
            "selected_peer_id": session.selected_peer_id,
            "api_url": ctx.config.api_url,
        })),
    }
    Ok(())
}
