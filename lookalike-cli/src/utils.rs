//! Common utility functions shared across CLI commands.

use std::path::Path;

use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};
use lookalike_core::{CatalogSnapshot, InMemoryCatalog};
use tracing::debug;

/// Load a catalog snapshot, trying CBOR first then JSON.
pub fn load_catalog(path: &Path) -> Result<InMemoryCatalog> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;

    let snapshot = CatalogSnapshot::from_bytes(&bytes)
        .with_context(|| format!("Failed to parse catalog file: {}", path.display()))?;
    debug!(path = %path.display(), items = snapshot.items.len(), "Loaded catalog");

    Ok(InMemoryCatalog::from_items(snapshot.items))
}

/// Write the catalog back as a snapshot; `.cbor` selects CBOR.
pub fn save_catalog(catalog: &InMemoryCatalog, path: &Path) -> Result<()> {
    catalog
        .save(path)
        .with_context(|| format!("Failed to write catalog file: {}", path.display()))?;
    debug!(path = %path.display(), items = catalog.len(), "Saved catalog");
    Ok(())
}

/// Read an image file into memory.
pub fn read_image(path: &Path) -> Result<Vec<u8>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read image file: {}", path.display()))?;
    debug!(path = %path.display(), bytes = bytes.len(), "Read image");
    Ok(bytes)
}

/// Similarity percentage, colored by strength.
pub fn colorize_similarity(similarity: f64) -> ColoredString {
    let text = format!("{similarity:>6.2}%");
    if similarity >= 90.0 {
        text.green().bold()
    } else if similarity >= 75.0 {
        text.green()
    } else if similarity >= 60.0 {
        text.yellow()
    } else {
        text.normal()
    }
}

/// Format a duration in milliseconds for humans.
pub fn format_duration(duration_ms: u64) -> String {
    if duration_ms < 1000 {
        format!("{duration_ms}ms")
    } else {
        format!("{:.1}s", duration_ms as f64 / 1000.0)
    }
}
