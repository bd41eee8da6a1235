//! Directory listing.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use chat_rest::RestError;

/// List other users, optionally filtered by a username substring.
pub async fn users(ctx: &Context, query: Option<&str>, format: &OutputFormat) -> Result<()> {
    let store = ctx.session_store()?;
    let session = ctx.require_session(&store)?;
    let rest = ctx.rest_client()?;

    let all = match rest.users(&session.token).await {
        Ok(users) => users,
        Err(RestError::Unauthorized) => {
            store.clear()?;
            anyhow::bail!("Session expired. Run 'chatline login' again");
        }
        Err(e) => return Err(e.into()),
    };

    let visible = chat_session::filter(&all, query.unwrap_or(""), Some(session.user_id));

    match format {
        OutputFormat::Text => {
            if visible.is_empty() {
                println!("No users found.");
            }
            for user in &visible {
                println!("  {:>6}  {}", user.id, user.username);
            }
        }
        OutputFormat::Json => output::print_json(&visible),
    }
    Ok(())
}
