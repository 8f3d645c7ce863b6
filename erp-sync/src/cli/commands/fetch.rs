//! `erp-sync fetch`

use anyhow::{Context, Result};
use colored::*;
use serde_json::Value;

use super::prompt_password;
use crate::cli::TableArgs;
use crate::cli::output::emit;
use crate::config::Config;

pub async fn handle_fetch_command(args: TableArgs, config: &Config) -> Result<()> {
    let client = config.client(args.env.env.as_deref(), prompt_password)?;
    let options = args.fetch_options(client.fetch_options());

    let records = client
        .fetch(&args.table, options)
        .await
        .with_context(|| format!("Failed to fetch {}", args.table))?;

    eprintln!(
        "Fetched {} records from {}",
        records.len().to_string().bright_green().bold(),
        args.table.cyan()
    );

    let data = Value::Array(records.into_iter().map(|r| r.into_value()).collect());
    emit(&data, args.format, args.output.as_deref())
}
