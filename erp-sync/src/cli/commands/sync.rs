//! `erp-sync sync`

use anyhow::Result;
use colored::*;
use serde_json::Value;

use super::prompt_password;
use crate::cli::TableArgs;
use crate::cli::output::emit;
use crate::config::Config;
use crate::sync::{MemoryLoader, RecordTransformer, SyncOptions, SyncReport, SyncRun};

pub async fn handle_sync_command(args: TableArgs, config: &Config) -> Result<()> {
    let client = config.client(args.env.env.as_deref(), prompt_password)?;
    let transformer = RecordTransformer::new(config.mapping.clone());
    let loader = MemoryLoader::new();

    let options = SyncOptions {
        fetch: args.fetch_options(client.fetch_options()),
        ..config.sync_options()
    };

    let report = SyncRun::new(&client, &transformer, &loader)
        .options(options)
        .run(&args.table)
        .await?;

    let data = Value::Array(loader.records().into_iter().map(Value::Object).collect());
    emit(&data, args.format, args.output.as_deref())?;
    print_summary(&report);
    Ok(())
}

fn print_summary(report: &SyncReport) {
    eprintln!();
    eprintln!("{} {}", "Sync summary for".bold(), report.table.cyan().bold());
    eprintln!("  Fetched:           {}", report.fetched);
    eprintln!("  Parents:           {}", report.resolved_parents);
    eprintln!("  Variants:          {}", report.resolved_variants);
    eprintln!(
        "  Loaded:            {} ({} created, {} updated)",
        report.loaded().to_string().bright_green(),
        report.created,
        report.updated
    );

    if !report.skipped.is_empty() {
        eprintln!("  Skipped:           {}", report.skipped.len().to_string().yellow());
        for skipped in &report.skipped {
            let position = skipped
                .position
                .map(|p| format!("#{}", p))
                .unwrap_or_else(|| "deferred".to_string());
            eprintln!(
                "    {} {}: {}",
                position.dimmed(),
                skipped.identity.as_deref().unwrap_or("<unknown>"),
                skipped.reason
            );
        }
    }

    if !report.rejected.is_empty() {
        eprintln!("  Rejected:          {}", report.rejected.len().to_string().red());
        for rejected in &report.rejected {
            eprintln!("    {}", rejected.reason.red());
        }
    }

    if !report.unresolved.is_empty() {
        eprintln!("  Unresolved:        {}", report.unresolved.len().to_string().red().bold());
        for unresolved in &report.unresolved {
            eprintln!("    {}", unresolved.to_string().red());
        }
    }

    if report.is_clean() {
        eprintln!("{}", "All records resolved".bright_green());
    }
}
