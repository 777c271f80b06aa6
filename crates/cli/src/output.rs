//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use predictor_lib::{Score, ScoreKind};
use serde::{Deserialize, Serialize};
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a list of items as a table or JSON array
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return Ok(());
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
    }
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a score for display
pub fn format_score(score: &Score) -> String {
    match score.kind {
        ScoreKind::Probability => format!("{:.1}%", score.value * 100.0),
        ScoreKind::Regression => format!("{:.2}", score.value),
        ScoreKind::ClassIndex => format!("class {}", score.value as usize),
    }
}

/// Color a category by its position among the policy's categories
///
/// `rank` counts from the least severe category; label lookups have no
/// ordering and are shown in bold.
pub fn color_category(category: &str, rank: Option<usize>, levels: usize) -> String {
    match rank {
        Some(0) => category.green().to_string(),
        Some(r) if r + 1 >= levels => category.red().bold().to_string(),
        Some(_) => category.yellow().to_string(),
        None => category.bold().to_string(),
    }
}
