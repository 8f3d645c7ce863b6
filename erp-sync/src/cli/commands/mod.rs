//! Command handlers

pub mod env;
pub mod fetch;
pub mod session;
pub mod sync;

use anyhow::Result;
use is_terminal::IsTerminal;

use super::{Cli, Commands};
use crate::config::Config;

/// Run the parsed command line
pub async fn run(cli: Cli) -> Result<()> {
    if cli.no_color {
        colored::control::set_override(false);
    }

    let config = Config::discover(cli.config.as_deref())?;

    match cli.command {
        Commands::Sync(args) => sync::handle_sync_command(args, &config).await,
        Commands::Fetch(args) => fetch::handle_fetch_command(args, &config).await,
        Commands::Session { action } => session::handle_session_command(action, &config).await,
        Commands::Env { action } => env::handle_env_command(action, &config),
    }
}

/// Ask for a password on an interactive terminal
pub fn prompt_password(username: &str) -> Option<String> {
    if !std::io::stdin().is_terminal() {
        return None;
    }
    match rpassword::prompt_password(format!("Password for {}: ", username)) {
        Ok(password) if !password.is_empty() => Some(password),
        Ok(_) => None,
        Err(e) => {
            log::warn!("Could not read password: {}", e);
            None
        }
    }
}
