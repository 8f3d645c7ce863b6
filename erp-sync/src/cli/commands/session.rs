//! `erp-sync session`

use anyhow::{Context, Result};
use colored::*;

use super::prompt_password;
use crate::cli::SessionCommands;
use crate::config::Config;

pub async fn handle_session_command(action: SessionCommands, config: &Config) -> Result<()> {
    match action {
        SessionCommands::Login(env) => {
            let client = config.client(env.env.as_deref(), prompt_password)?;
            let session = client.session();
            if !session.login().await.context("Login failed")? {
                anyhow::bail!("Credentials rejected by {}", client.base_url());
            }
            println!("{} {}", "Logged in to".bright_green(), client.base_url().cyan());
        }
        SessionCommands::Validate(env) => {
            let client = config.client(env.env.as_deref(), |_| None)?;
            let valid = client
                .session()
                .restore_session()
                .await
                .context("Failed to probe the session")?;
            if valid {
                println!("{} {}", "Session valid for".bright_green(), client.base_url().cyan());
            } else {
                println!("{} {}", "No valid session for".yellow(), client.base_url().cyan());
            }
        }
        SessionCommands::Logout(env) => {
            let client = config.client(env.env.as_deref(), |_| None)?;
            let session = client.session();
            if !session.restore_session().await.unwrap_or(false) {
                log::debug!("No live session for {}, clearing local state only", client.base_url());
            }
            session.logout().await.context("Logout failed")?;
            println!("{} {}", "Logged out of".bright_green(), client.base_url().cyan());
        }
    }
    Ok(())
}
