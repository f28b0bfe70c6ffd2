//! Output formatting utilities

use capacity_lib::models::{AlertSeverity, DaysUntilFull, RecommendationSeverity};
use capacity_lib::units::format_gib;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Utilization above which a value renders red
const CRITICAL_PCT: f64 = 80.0;
/// Utilization above which a value renders yellow
const WARNING_PCT: f64 = 70.0;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table of rows, or the serializable source items as JSON
pub fn print_rows<T: Tabled, S: Serialize + ?Sized>(rows: Vec<T>, source: &S, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            println!("{}", render_table(rows));
        }
        OutputFormat::Json => print_json(source),
    }
}

pub fn render_table<T: Tabled>(rows: Vec<T>) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn print_json<S: Serialize + ?Sized>(value: &S) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => print_error(&format!("Failed to serialize output: {}", e)),
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a GiB capacity for display
pub fn format_capacity(gib: f64) -> String {
    format_gib(gib)
}

pub fn format_pct(pct: f64) -> String {
    format!("{:.1}%", pct)
}

pub fn format_days(days: DaysUntilFull) -> String {
    match days {
        DaysUntilFull::Days(1) => "1 day".to_string(),
        DaysUntilFull::Days(d) => format!("{} days", d),
        DaysUntilFull::Stable => "stable".to_string(),
    }
}

/// Color utilization by alert band
pub fn color_utilization(pct: f64) -> String {
    let formatted = format_pct(pct);
    if pct > CRITICAL_PCT {
        formatted.red().to_string()
    } else if pct > WARNING_PCT {
        formatted.yellow().to_string()
    } else {
        formatted.green().to_string()
    }
}

pub fn color_severity(severity: AlertSeverity) -> String {
    let label = severity.to_string();
    match severity {
        AlertSeverity::Urgent => label.red().bold().to_string(),
        AlertSeverity::Critical => label.red().to_string(),
        AlertSeverity::Warning => label.yellow().to_string(),
    }
}

/// Marker printed before a recommendation title
pub fn recommendation_marker(severity: RecommendationSeverity) -> String {
    match severity {
        RecommendationSeverity::Danger => "✗".red().bold().to_string(),
        RecommendationSeverity::Info => "ℹ".blue().bold().to_string(),
        RecommendationSeverity::Success => "✓".green().bold().to_string(),
    }
}
