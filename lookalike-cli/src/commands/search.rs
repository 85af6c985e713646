//! Search command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use lookalike_core::{CandidateFilter, EngineConfig, LocalFetcher, SearchEngine};
use tracing::info;

use crate::utils::{colorize_similarity, load_catalog, read_image};

#[derive(Args)]
pub struct SearchArgs {
    /// Path to the catalog snapshot (JSON or CBOR)
    #[arg(value_name = "CATALOG")]
    pub catalog: PathBuf,

    /// Path to the query image
    #[arg(value_name = "IMAGE")]
    pub image: PathBuf,

    /// Minimum similarity, 0-100 (default: LOOKALIKE_SEARCH_THRESHOLD or 60)
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Maximum number of results (default: LOOKALIKE_SEARCH_LIMIT or 20)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Only consider items in this category
    #[arg(long)]
    pub category: Option<String>,

    /// Also consider inactive items
    #[arg(long)]
    pub include_inactive: bool,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the search command.
pub async fn execute(args: SearchArgs, quiet: bool) -> Result<()> {
    let config = EngineConfig::from_env();
    let query = read_image(&args.image)?;
    let catalog = Arc::new(load_catalog(&args.catalog)?);

    // Searching never fetches; stored fingerprints are all it needs.
    let engine = SearchEngine::new(catalog, Arc::new(LocalFetcher::default()));

    let mut request = config.search_request();
    if let Some(threshold) = args.threshold {
        request.threshold = threshold;
    }
    if let Some(limit) = args.limit {
        request.limit = limit;
    }
    let mut filter = if args.include_inactive {
        CandidateFilter::all()
    } else {
        CandidateFilter::default()
    };
    filter.category = args.category;
    request.filter = filter;

    let results = engine
        .search(&query, &request)
        .await
        .context("Search failed")?;
    info!(results = results.len(), "Search finished");

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&results).context("Failed to serialize results")?
        );
        return Ok(());
    }

    if results.is_empty() {
        if !quiet {
            println!(
                "{}",
                format!("No matches at or above {:.2}%", request.threshold).yellow()
            );
        }
        return Ok(());
    }

    if !quiet {
        println!();
        println!(
            "{}",
            format!("{} match(es) for {}", results.len(), args.image.display()).bold()
        );
        println!();
    }
    for (rank, result) in results.iter().enumerate() {
        println!(
            "{:>3}. {} {} {} {}",
            rank + 1,
            colorize_similarity(result.similarity),
            result.item_id.bold(),
            format!("[{}]", result.matched_variant).dimmed(),
            result.matched_image_url.dimmed()
        );
    }
    Ok(())
}
