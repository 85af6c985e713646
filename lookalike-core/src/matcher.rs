//! Ranking catalog items against a query fingerprint.
//!
//! Every populated variant of every image record of every candidate is
//! scored, so the cost is linear in `candidates x images x 6`. There is no
//! index; this is sized for catalogs of thousands of items, not millions.
//!
//! The query is only ever fingerprinted in its standard orientation.
//! Orientation tolerance comes entirely from the variants stored for catalog
//! images: an upside-down query photo still matches an upright product shot
//! through its `rotated_180` variant, but two differently rotated query
//! photos are not reconciled with each other.

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogItem;
use crate::fingerprint::Variant;
use crate::similarity::similarity;

/// One ranked match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub item_id: String,
    /// Best similarity over all images and variants, `0..=100`, 2 decimals.
    pub similarity: f64,
    pub matched_variant: Variant,
    pub matched_image_url: String,
}

/// The best-scoring `(image, variant)` of one item, if it has any
/// fingerprints at all.
///
/// Ties keep the first pair seen, in record order then [`Variant::ALL`]
/// order.
pub fn best_match(query_hex: &str, item: &CatalogItem) -> Option<SearchResult> {
    let mut best: Option<SearchResult> = None;

    for record in &item.fingerprints {
        for (variant, stored_hex) in record.fingerprints.iter() {
            let score = similarity(query_hex, stored_hex);
            if best.as_ref().map_or(true, |b| score > b.similarity) {
                best = Some(SearchResult {
                    item_id: item.id.clone(),
                    similarity: score,
                    matched_variant: variant,
                    matched_image_url: record.image_url.clone(),
                });
            }
        }
    }

    best
}

/// Rank `candidates` by their best similarity to `query_hex`.
///
/// Items scoring below `threshold` are dropped, the rest are sorted by
/// descending similarity (stable, so equal scores keep candidate order) and
/// truncated to `limit`.
pub fn search(
    query_hex: &str,
    candidates: &[CatalogItem],
    threshold: f64,
    limit: usize,
) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = candidates
        .iter()
        .filter_map(|item| best_match(query_hex, item))
        .filter(|result| result.similarity >= threshold)
        .collect();

    results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    results.truncate(limit);
    results
}
