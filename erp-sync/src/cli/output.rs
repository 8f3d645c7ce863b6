//! Rendering of fetched and loaded records

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::*;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// Single-line JSON
    JsonCompact,
    /// CSV with one column per field
    Csv,
}

/// Format records according to the requested output format
pub fn format_output(data: &Value, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(data).context("Failed to format JSON output"),
        OutputFormat::JsonCompact => serde_json::to_string(data).context("Failed to format JSON output"),
        OutputFormat::Csv => json_to_csv(data),
    }
}

/// Print to stdout, or write to `output` when given
pub fn emit(data: &Value, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    let formatted = format_output(data, format)?;

    match output {
        Some(path) => {
            fs::write(path, &formatted)
                .with_context(|| format!("Failed to write output to: {}", path.display()))?;
            eprintln!("Results saved to: {}", path.display().to_string().bright_green());
        }
        None => println!("{}", formatted),
    }
    Ok(())
}

/// Convert an array of objects to CSV
///
/// Columns are the union of all keys, in first-seen order.
fn json_to_csv(data: &Value) -> Result<String> {
    let rows: Vec<&serde_json::Map<String, Value>> = match data {
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        Value::Object(obj) => vec![obj],
        _ => anyhow::bail!("CSV output needs an array of records"),
    };

    let mut headers: Vec<&str> = Vec::new();
    for row in &rows {
        for key in row.keys() {
            if !headers.contains(&key.as_str()) {
                headers.push(key);
            }
        }
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    if !headers.is_empty() {
        writer.write_record(&headers).context("Failed to write CSV header")?;
    }
    for row in &rows {
        let cells: Vec<String> = headers
            .iter()
            .map(|h| row.get(*h).map(json_value_to_string).unwrap_or_default())
            .collect();
        writer.write_record(&cells).context("Failed to write CSV row")?;
    }

    let bytes = writer.into_inner().context("Failed to finish CSV output")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

/// Convert a JSON value to a CSV cell
fn json_value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
