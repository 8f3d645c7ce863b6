//! Command-line interface

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::api::{FetchOptions, FilterExpression};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "erp-sync")]
#[command(about = "Sync product tables from a legacy 4D ERP gateway")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to $ERP_SYNC_CONFIG, then the user config dir)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fetch, transform and load a table, then print the loaded records
    Sync(TableArgs),

    /// Fetch a table and print the raw records
    Fetch(TableArgs),

    /// Session management
    Session {
        #[command(subcommand)]
        action: SessionCommands,
    },

    /// Configured environments
    Env {
        #[command(subcommand)]
        action: EnvCommands,
    },
}

#[derive(Debug, Subcommand)]
pub enum SessionCommands {
    /// Log in and persist the session
    Login(EnvArg),
    /// Check whether the stored session is still accepted
    Validate(EnvArg),
    /// End the stored session
    Logout(EnvArg),
}

#[derive(Debug, Subcommand)]
pub enum EnvCommands {
    /// List configured environments
    List,
}

#[derive(Debug, Clone, Args)]
pub struct EnvArg {
    /// Environment name (defaults to default_environment)
    #[arg(short, long)]
    pub env: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct TableArgs {
    /// Legacy table name
    pub table: String,

    #[command(flatten)]
    pub env: EnvArg,

    /// Filter triple `field operator value`, repeatable
    #[arg(short, long = "filter", value_name = "FILTER")]
    pub filters: Vec<String>,

    /// Records per page (defaults to the configured page size)
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Records to skip before the first page
    #[arg(long, default_value_t = 0)]
    pub skip: usize,

    /// Fetch only the first page
    #[arg(long)]
    pub single_page: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Write output to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl TableArgs {
    /// Fetch options on top of `defaults`
    pub fn fetch_options(&self, defaults: FetchOptions) -> FetchOptions {
        let mut options = defaults.skip(self.skip);
        if let Some(page_size) = self.page_size {
            options = options.page_size(page_size);
        }
        if self.single_page {
            options = options.single_page();
        }
        if !self.filters.is_empty() {
            options = options.filter(FilterExpression::from_cli(&self.filters));
        }
        options
    }
}
