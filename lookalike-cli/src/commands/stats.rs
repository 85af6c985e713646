//! Stats command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use lookalike_core::{LocalFetcher, SearchEngine};

use crate::utils::load_catalog;

/// Execute the stats command.
pub async fn execute(catalog_path: PathBuf, json: bool, quiet: bool) -> Result<()> {
    let catalog = Arc::new(load_catalog(&catalog_path)?);
    let engine = SearchEngine::new(catalog, Arc::new(LocalFetcher::default()));
    let stats = engine.stats().await.context("Catalog unavailable")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&stats).context("Failed to serialize stats")?
        );
        return Ok(());
    }

    if !quiet {
        println!();
        println!("{}", catalog_path.display().to_string().bold());
        println!();
    }
    println!("   {} {}", "Items:".dimmed(), stats.total_items);
    println!(
        "   {} {}",
        "Fingerprinted:".dimmed(),
        stats.items_with_fingerprints
    );
    let coverage = format!("{:.2}%", stats.coverage_percent);
    let coverage = if stats.coverage_percent >= 100.0 {
        coverage.green()
    } else {
        coverage.yellow()
    };
    println!("   {} {}", "Coverage:".dimmed(), coverage);
    Ok(())
}
