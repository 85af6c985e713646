//! Fingerprint command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use lookalike_core::{EngineConfig, ItemStatus, PipelineReport, RoutingFetcher, SearchEngine};
use tracing::{info, warn};

use crate::utils::{format_duration, load_catalog, save_catalog};

#[derive(Args)]
pub struct FingerprintArgs {
    /// Path to the catalog snapshot (JSON or CBOR)
    #[arg(value_name = "CATALOG")]
    pub catalog: PathBuf,

    /// Only fingerprint this item
    #[arg(long, value_name = "ID")]
    pub item: Option<String>,

    /// Recompute fingerprints that already exist
    #[arg(long)]
    pub force: bool,

    /// Items read per page (default: LOOKALIKE_BATCH_SIZE or 50)
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Items processed at once (default: LOOKALIKE_MAX_CONCURRENT or 5)
    #[arg(long, value_name = "N")]
    pub max_concurrent: Option<usize>,

    /// Reprocess items that already have fingerprints
    #[arg(long)]
    pub no_skip_existing: bool,

    /// Write the updated catalog here instead of in place
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the fingerprint command.
pub async fn execute(args: FingerprintArgs, quiet: bool) -> Result<()> {
    let config = EngineConfig::from_env();
    let catalog = Arc::new(load_catalog(&args.catalog)?);
    info!(path = %args.catalog.display(), items = catalog.len(), "Loaded catalog");

    let mut fetcher = RoutingFetcher::from_config(config.http_fetcher_config())
        .context("Failed to create HTTP client")?;
    // Relative image paths in a snapshot are relative to the snapshot itself.
    if let Some(dir) = args.catalog.parent().filter(|d| !d.as_os_str().is_empty()) {
        fetcher = fetcher.with_base_dir(dir);
    }
    let engine = SearchEngine::from_config(catalog.clone(), Arc::new(fetcher), &config);

    let mut options = config.pipeline_options();
    options.force_regenerate = args.force;
    options.skip_existing = !args.no_skip_existing;
    if let Some(batch_size) = args.batch_size {
        options.batch_size = batch_size;
    }
    if let Some(max_concurrent) = args.max_concurrent {
        options.max_concurrent = max_concurrent;
    }

    // Ctrl-C stops new items from starting; in-flight items finish.
    let shutdown = engine.shutdown_handle();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Shutdown requested, finishing in-flight items");
            shutdown.request();
        }
    });

    let report = match &args.item {
        Some(item_id) => engine.fingerprint_item(item_id, args.force).await,
        None => engine.fingerprint_all(options).await,
    };
    signal_task.abort();

    let output = args.output.as_ref().unwrap_or(&args.catalog);
    save_catalog(&catalog, output)?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else if !quiet {
        print_summary(&report, output);
    }

    if !report.store_errors.is_empty() {
        bail!("Catalog unavailable: {}", report.store_errors.join("; "));
    }
    if let Some(item_id) = &args.item {
        if let Some(ItemStatus::Failed { reason }) = report.item(item_id).map(|r| &r.status) {
            bail!("Fingerprinting failed for {item_id}: {reason}");
        }
    }
    Ok(())
}

fn print_summary(report: &PipelineReport, output: &std::path::Path) {
    println!();
    println!("{}", "Fingerprinting complete".green().bold());
    println!();
    println!("   {} {}", "Persisted:".dimmed(), report.processed.to_string().green());
    println!("   {} {}", "Skipped:".dimmed(), report.skipped);
    if report.failed > 0 {
        println!("   {} {}", "Failed:".dimmed(), report.failed.to_string().red());
    } else {
        println!("   {} {}", "Failed:".dimmed(), report.failed);
    }
    println!(
        "   {} {}",
        "Duration:".dimmed(),
        format_duration(report.duration_ms)
    );
    println!("   {} {}", "Catalog:".dimmed(), output.display());

    if report.interrupted {
        println!();
        println!("{}", "Interrupted: remaining items were not started".yellow());
    }

    if !report.image_failures.is_empty() {
        println!();
        println!("{}", "Image failures:".yellow());
        for failure in &report.image_failures {
            println!(
                "   {} {} ({}, {} attempt{})",
                failure.item_id.bold(),
                failure.image_url,
                failure.reason,
                failure.attempts,
                if failure.attempts == 1 { "" } else { "s" }
            );
        }
    }

    for item in &report.items {
        if let ItemStatus::Failed { reason } = &item.status {
            println!("   {} {}: {}", "failed".red(), item.item_id, reason);
        }
    }
}
