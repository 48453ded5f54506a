// System status display: model files, database stats, stored review counts.

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use crate::config::Config;
use crate::db::{self, queries};

/// Display system status to the terminal.
pub fn show(config: &Config) -> Result<()> {
    if config.force_lexicon {
        println!("Sentiment: lexicon only (REVIEWLENS_FORCE_LEXICON)");
    } else if config.model_present() {
        println!(
            "Sentiment model: {} ({})",
            config.model.green(),
            config.model_dir.display()
        );
    } else {
        println!(
            "Sentiment model: {} in {}",
            "not downloaded".yellow(),
            config.model_dir.display()
        );
        println!("  Run `reviewlens download-model`, or analysis will use the lexicon scorer");
    }

    match &config.themes_path {
        Some(path) => println!("Theme lexicon: {}", path.display()),
        None => println!("Theme lexicon: built-in (5 themes)"),
    }

    if !Path::new(&config.db_path).exists() {
        println!("Database: not initialized");
        println!("\nRun `reviewlens persist --input <tagged.csv>` to create it.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&config.db_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Database: {} ({})", config.db_path, file_size);

    let conn = db::open(&config.db_path)?;
    let counts = queries::review_counts_by_bank(&conn)?;
    if counts.is_empty() {
        println!("Stored reviews: none yet");
        return Ok(());
    }

    println!("Stored reviews: {}", queries::review_count(&conn)?);
    for (bank, count) in &counts {
        println!("  {:<36} {}", bank, count);
    }

    let labels = queries::label_counts(&conn)?;
    let summary: Vec<String> = labels
        .iter()
        .map(|(label, count)| format!("{label} {count}"))
        .collect();
    println!("By sentiment: {}", summary.join(", "));

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
