use std::fmt::Display;

use serde::Serialize;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Human }
    }
}

/// Render records one per line, or as a pretty JSON array.
pub fn render_records<T: Serialize + Display>(
    format: OutputFormat,
    records: &[T],
) -> serde_json::Result<String> {
    match format {
        OutputFormat::Human => Ok(records
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")),
        OutputFormat::Json => serde_json::to_string_pretty(records),
    }
}

/// Render a single record.
pub fn render_record<T: Serialize + Display>(
    format: OutputFormat,
    record: &T,
) -> serde_json::Result<String> {
    match format {
        OutputFormat::Human => Ok(record.to_string()),
        OutputFormat::Json => serde_json::to_string_pretty(record),
    }
}

/// Render a confirmation message.
pub fn render_success(format: OutputFormat, message: &str) -> String {
    match format {
        OutputFormat::Human => message.to_string(),
        OutputFormat::Json => serde_json::json!({"success": true, "message": message}).to_string(),
    }
}

/// Render a failure message for stderr.
pub fn render_error(format: OutputFormat, message: &str) -> String {
    match format {
        OutputFormat::Human => format!("Error: {message}"),
        OutputFormat::Json => serde_json::json!({"success": false, "error": message}).to_string(),
    }
}

/// Print a list of records to stdout. An empty list prints nothing in human
/// mode and `[]` in JSON mode.
pub fn print_records<T: Serialize + Display>(
    format: OutputFormat,
    records: &[T],
) -> anyhow::Result<()> {
    let rendered = render_records(format, records)?;
    if !rendered.is_empty() {
        println!("{rendered}");
    }
    Ok(())
}

pub fn print_record<T: Serialize + Display>(format: OutputFormat, record: &T) -> anyhow::Result<()> {
    println!("{}", render_record(format, record)?);
    Ok(())
}

pub fn print_success(format: OutputFormat, message: &str) {
    println!("{}", render_success(format, message));
}

pub fn print_error(format: OutputFormat, message: &str) {
    eprintln!("{}", render_error(format, message));
}
