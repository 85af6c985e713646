//! Hash command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use lookalike_core::{analyze_image, ColorHistogram, Variant};

use crate::utils::read_image;

/// Execute the hash command.
///
/// Without flags only the standard fingerprint is printed, one hex line, so
/// the output can be piped.
pub fn execute(image: PathBuf, all_variants: bool, histogram: bool, json: bool) -> Result<()> {
    let bytes = read_image(&image)?;
    let analysis = analyze_image(&bytes)
        .with_context(|| format!("Image could not be fingerprinted: {}", image.display()))?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&analysis).context("Failed to serialize analysis")?
        );
        return Ok(());
    }

    if all_variants {
        for (variant, hex) in analysis.fingerprints.iter() {
            println!("{:<12} {}", variant.as_str(), hex);
        }
    } else if let Some(hex) = analysis.fingerprints.get(Variant::Standard) {
        println!("{hex}");
    }

    if histogram {
        print_histogram(&analysis.histogram);
    }
    Ok(())
}

fn print_histogram(histogram: &ColorHistogram) {
    for (name, bins) in ["red", "green", "blue"].iter().zip(histogram.channels()) {
        let samples: u64 = bins.iter().map(|&c| u64::from(c)).sum();
        let weighted: u64 = bins
            .iter()
            .enumerate()
            .map(|(value, &count)| value as u64 * u64::from(count))
            .sum();
        let mean = if samples == 0 {
            0.0
        } else {
            weighted as f64 / samples as f64
        };
        let peak = bins
            .iter()
            .enumerate()
            .max_by_key(|&(_, count)| *count)
            .map(|(value, _)| value)
            .unwrap_or(0);
        println!("{name:<6} mean {mean:>6.2} peak {peak:>3}");
    }
}
