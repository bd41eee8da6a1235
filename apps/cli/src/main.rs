//! chatline - command-line chat client.

mod commands;
mod output;

use chat_config_and_utils::{init_logging, Paths};
use chat_protocol::UserId;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// chatline - chat with other users from the terminal.
#[derive(Parser)]
#[command(name = "chatline")]
#[command(about = "Terminal client for the chat backend")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error); defaults to the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Directory holding config, session and logs (default ~/.chatline)
    #[arg(long, global = true, env = "CHATLINE_HOME")]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Login with username and password
    Login,

    /// Create an account
    Register,

    /// Logout and clear the stored session
    Logout,

    /// Show the stored session
    Status,

    /// List other users
    Users {
        /// Only users whose name contains this text
        #[arg(short = 'q', long)]
        filter: Option<String>,
    },

    /// Open the interactive chat
    Chat {
        /// Open the conversation with this user id
        #[arg(short, long)]
        peer: Option<UserId>,
    },
}

async fn run(cli: Cli, ctx: commands::Context) -> anyhow::Result<()> {
    let format = &cli.format;
    match cli.command {
        Commands::Login => commands::login(&ctx, format).await,
        Commands::Register => commands::register(&ctx, format).await,
        Commands::Logout => commands::logout(&ctx, format).await,
        Commands::Status => commands::status(&ctx, format).await,
        Commands::Users { filter } => commands::users(&ctx, filter.as_deref(), format).await,
        Commands::Chat { peer } => commands::chat(&ctx, peer).await,
    }
}

fn load_context(base_dir: Option<PathBuf>) -> anyhow::Result<commands::Context> {
    let paths = match base_dir {
        Some(dir) => Paths::with_base_dir(dir),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;
    commands::Context::load(paths)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let ctx = match load_context(cli.base_dir.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            output::print_error(&format!("{:#}", e), &cli.format);
            std::process::exit(1);
        }
    };

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| ctx.config.log_level.clone());
    init_logging(&level, Some(ctx.paths.log_file()));
    tracing::debug!(base_dir = %ctx.paths.base_dir().display(), "starting");

    let format = cli.format;
    if let Err(e) = run(cli, ctx).await {
        output::print_error(&format!("{:#}", e), &format);
        std::process::exit(1);
    }
}
