//! `erp-sync env`

use anyhow::Result;
use colored::*;

use crate::cli::EnvCommands;
use crate::config::Config;

pub fn handle_env_command(action: EnvCommands, config: &Config) -> Result<()> {
    match action {
        EnvCommands::List => {
            if config.environments.is_empty() {
                println!("No environments configured");
                return Ok(());
            }
            for (name, env) in &config.environments {
                let marker = if config.default_environment.as_deref() == Some(name.as_str()) {
                    "*".bright_green().bold()
                } else {
                    " ".normal()
                };
                println!(
                    "{} {:<12} {} {}",
                    marker,
                    name.bold(),
                    env.base_url.cyan(),
                    env.username.as_deref().unwrap_or("").dimmed()
                );
            }
        }
    }
    Ok(())
}
