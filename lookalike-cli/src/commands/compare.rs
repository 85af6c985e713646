//! Compare command implementation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use lookalike_core::{analyze_image, histogram_correlation, similarity, ImageAnalysis, Variant};
use serde_json::json;

use crate::utils::{colorize_similarity, read_image};

fn analyze(path: &Path) -> Result<ImageAnalysis> {
    let bytes = read_image(path)?;
    analyze_image(&bytes)
        .with_context(|| format!("Image could not be fingerprinted: {}", path.display()))
}

/// Execute the compare command.
///
/// A is treated as the query and B as the catalog photo: A's standard
/// fingerprint is scored against every variant of B.
pub fn execute(image_a: PathBuf, image_b: PathBuf, json: bool, quiet: bool) -> Result<()> {
    let a = analyze(&image_a)?;
    let b = analyze(&image_b)?;

    let query = a.fingerprints.get(Variant::Standard).unwrap_or_default();
    let standard = b
        .fingerprints
        .get(Variant::Standard)
        .map(|hex| similarity(query, hex))
        .unwrap_or(0.0);

    let mut best = (Variant::Standard, standard);
    for (variant, hex) in b.fingerprints.iter() {
        let score = similarity(query, hex);
        if score > best.1 {
            best = (variant, score);
        }
    }
    let correlation = histogram_correlation(&a.histogram, &b.histogram);

    if json {
        let output = json!({
            "similarity": standard,
            "best_variant": best.0,
            "best_similarity": best.1,
            "histogram_correlation": correlation,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialize comparison")?
        );
        return Ok(());
    }

    if !quiet {
        println!();
        println!(
            "{} {} {}",
            image_a.display().to_string().bold(),
            "vs".dimmed(),
            image_b.display().to_string().bold()
        );
        println!();
    }
    println!("   {} {}", "Similarity:".dimmed(), colorize_similarity(standard));
    println!(
        "   {} {} ({})",
        "Best orientation:".dimmed(),
        colorize_similarity(best.1),
        best.0
    );
    println!("   {} {:.2}", "Color correlation:".dimmed(), correlation);
    Ok(())
}
