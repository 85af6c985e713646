//! Fingerprint and histogram scoring.
//!
//! [`similarity`] is the score used for ranking: the share of matching bits
//! between two hex fingerprints, as a percentage. It never fails; anything it
//! cannot compare scores `0.0` so one bad stored record cannot abort a scan
//! over many candidates. [`try_similarity`] exposes the underlying error.

use crate::error::ScoreError;
use crate::fingerprint::{ColorHistogram, HISTOGRAM_BINS};

/// Compute the Hamming distance between two packed fingerprints.
///
/// # Returns
///
/// The number of differing bits, or [`ScoreError::LengthMismatch`] when the
/// inputs differ in length. Fingerprints of different sizes are never
/// comparable.
pub fn hamming_distance(a: &[u8], b: &[u8]) -> Result<u32, ScoreError> {
    if a.len() != b.len() {
        return Err(ScoreError::LengthMismatch {
            left: a.len() * 8,
            right: b.len() * 8,
        });
    }

    Ok(a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum())
}

/// Similarity of two hex fingerprints in `[0, 100]`, or the reason they
/// cannot be compared.
pub fn try_similarity(hex_a: &str, hex_b: &str) -> Result<f64, ScoreError> {
    let a = decode(hex_a)?;
    let b = decode(hex_b)?;
    let distance = hamming_distance(&a, &b)?;
    Ok(distance_to_percent(distance, a.len() * 8))
}

/// Similarity of two hex fingerprints in `[0, 100]`, rounded to 2 decimals.
///
/// Returns `0.0` for malformed or mismatched inputs.
pub fn similarity(hex_a: &str, hex_b: &str) -> f64 {
    try_similarity(hex_a, hex_b).unwrap_or(0.0)
}

/// Pearson correlation of two histograms, averaged over the three channels
/// and scaled to a percentage in roughly `[-100, 100]`.
///
/// A channel with zero variance, or with the wrong number of buckets,
/// contributes `0` to the average.
pub fn histogram_correlation(h1: &ColorHistogram, h2: &ColorHistogram) -> f64 {
    let total: f64 = h1
        .channels()
        .iter()
        .zip(h2.channels().iter())
        .map(|(x, y)| channel_correlation(x, y))
        .sum();

    round2(total / 3.0 * 100.0)
}

fn channel_correlation(x: &[u32], y: &[u32]) -> f64 {
    if x.len() != HISTOGRAM_BINS || y.len() != HISTOGRAM_BINS {
        return 0.0;
    }

    let n = HISTOGRAM_BINS as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2, mut sum_y2) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for (&a, &b) in x.iter().zip(y) {
        let (a, b) = (f64::from(a), f64::from(b));
        sum_x += a;
        sum_y += b;
        sum_xy += a * b;
        sum_x2 += a * a;
        sum_y2 += b * b;
    }

    let numerator = sum_xy - sum_x * sum_y / n;
    let denominator = ((sum_x2 - sum_x * sum_x / n) * (sum_y2 - sum_y * sum_y / n)).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    numerator / denominator
}

pub(crate) fn distance_to_percent(distance: u32, bits: usize) -> f64 {
    if bits == 0 {
        return 0.0;
    }
    let bits = bits as f64;
    round2((bits - f64::from(distance)) / bits * 100.0)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn decode(hex_str: &str) -> Result<Vec<u8>, ScoreError> {
    let bytes = hex::decode(hex_str)
        .map_err(|e| ScoreError::InvalidEncoding(format!("Invalid hex string: {e}")))?;
    if bytes.is_empty() {
        return Err(ScoreError::Empty);
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hamming_distance_identical() {
        let hash = [0x00, 0xFF, 0xAA, 0x55];
        assert_eq!(hamming_distance(&hash, &hash), Ok(0));
    }

    #[test]
    fn test_hamming_distance_different() {
        let hash1 = [0x00; 8];
        let hash2 = [0xFF; 8];
        assert_eq!(hamming_distance(&hash1, &hash2), Ok(64));
    }

    #[test]
    fn test_hamming_distance_partial() {
        let hash1 = [0x00, 0x00, 0x00, 0x00];
        let hash2 = [0x01, 0x00, 0x80, 0x00];
        assert_eq!(hamming_distance(&hash1, &hash2), Ok(2));
    }

    #[test]
    fn test_hamming_distance_length_mismatch() {
        let result = hamming_distance(&[0x00; 5], &[0x00; 8]);
        assert_eq!(
            result,
            Err(ScoreError::LengthMismatch {
                left: 40,
                right: 64
            })
        );
    }

    #[test]
    fn test_similarity_self_is_hundred() {
        assert_eq!(similarity("deadbeef", "deadbeef"), 100.0);
    }

    #[test]
    fn test_similarity_values() {
        // 1 of 16 bits differs.
        assert_eq!(similarity("0000", "0001"), 93.75);
        // 1 of 24 bits differs: 95.8333.. rounds to 95.83.
        assert_eq!(similarity("000000", "000001"), 95.83);
        assert_eq!(similarity("ffff", "0000"), 0.0);
    }

    #[test]
    fn test_similarity_symmetric() {
        let pairs = [("0f0f", "f0f1"), ("abcdef", "abcdee"), ("00", "ff")];
        for (a, b) in pairs {
            assert_eq!(similarity(a, b), similarity(b, a));
        }
    }

    #[test]
    fn test_similarity_length_mismatch_is_zero() {
        assert_eq!(similarity("ffff", "ffffff"), 0.0);
        assert!(matches!(
            try_similarity("ffff", "ffffff"),
            Err(ScoreError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_similarity_malformed_is_zero() {
        assert_eq!(similarity("zzzz", "ffff"), 0.0);
        assert_eq!(similarity("fff", "fff"), 0.0);
        assert_eq!(similarity("", ""), 0.0);
    }

    fn histogram_with(red: Vec<u32>) -> ColorHistogram {
        ColorHistogram {
            red: red.clone(),
            green: red.clone(),
            blue: red,
        }
    }

    #[test]
    fn test_histogram_correlation_identical() {
        let bins: Vec<u32> = (0..256).map(|i| (i % 7) as u32).collect();
        let h = histogram_with(bins);
        assert_eq!(histogram_correlation(&h, &h), 100.0);
    }

    #[test]
    fn test_histogram_correlation_inverse() {
        let up: Vec<u32> = (0..256).collect();
        let down: Vec<u32> = (0..256).rev().collect();
        let score = histogram_correlation(&histogram_with(up), &histogram_with(down));
        assert_eq!(score, -100.0);
    }

    #[test]
    fn test_histogram_correlation_zero_variance_channel() {
        let varied: Vec<u32> = (0..256).map(|i| (i % 5) as u32).collect();
        let flat = vec![1u32; 256];

        let a = ColorHistogram {
            red: varied.clone(),
            green: varied.clone(),
            blue: flat.clone(),
        };
        let b = ColorHistogram {
            red: varied.clone(),
            green: varied,
            blue: flat,
        };

        // Two perfect channels and one contributing zero.
        assert_eq!(histogram_correlation(&a, &b), 66.67);
    }

    #[test]
    fn test_histogram_correlation_malformed_channel() {
        let good = ColorHistogram::default();
        let bad = ColorHistogram {
            red: vec![1; 3],
            ..ColorHistogram::default()
        };
        let score = histogram_correlation(&good, &bad);
        assert!(score.is_finite());
        assert_eq!(score, 0.0);
    }
}
