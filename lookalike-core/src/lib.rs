//! Lookalike Core - reverse image search for product catalogs
//!
//! Finds catalog products that look like a query photo. Every catalog image
//! is reduced to a compact average-hash fingerprint (plus rotated and flipped
//! variants) ahead of time; a query is fingerprinted once and ranked against
//! the stored fingerprints by Hamming similarity.
//!
//! # Features
//!
//! - 1024-bit average-hash fingerprints over a 32x32 grayscale grid
//! - Orientation variants (90/180/270 degree rotations, both flips)
//! - Per-channel RGB color histograms with Pearson correlation
//! - Threshold/limit ranking over a candidate set
//! - Batch fingerprinting with bounded concurrency, retry and partial-failure
//!   isolation (`network` feature)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use lookalike_core::{
//!     InMemoryCatalog, PipelineOptions, RoutingFetcher, SearchEngine, SearchRequest,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = Arc::new(InMemoryCatalog::load("catalog.json".as_ref())?);
//! let fetcher = Arc::new(RoutingFetcher::from_config(Default::default())?);
//! let engine = SearchEngine::new(catalog, fetcher);
//!
//! // Populate fingerprints, then query.
//! let report = engine.fingerprint_all(PipelineOptions::default()).await;
//! println!("{} items fingerprinted", report.processed);
//!
//! let query = std::fs::read("photo.jpg")?;
//! for result in engine.search(&query, &SearchRequest::default()).await? {
//!     println!("{} {:.2}% ({})", result.item_id, result.similarity, result.matched_variant);
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod error;
pub mod fingerprint;
pub mod matcher;
pub mod similarity;

#[cfg(feature = "network")]
pub mod config;
#[cfg(feature = "network")]
pub mod engine;
#[cfg(feature = "network")]
pub mod fetch;
#[cfg(feature = "network")]
pub mod pipeline;

// Re-export main types for convenience
pub use catalog::{
    CandidateFilter, CatalogImageRecord, CatalogItem, CatalogSnapshot, CatalogStats,
    SnapshotFormat,
};
pub use error::{FetchError, ImageError, Result, ScoreError, SearchError, StoreError};
pub use fingerprint::{
    analyze_image, compute_histogram, generate_fingerprint, generate_fingerprint_set,
    image_metadata, is_supported_format, AverageHasher, ColorHistogram, Fingerprint,
    FingerprintSet, ImageAnalysis, ImageMetadata, Variant, FINGERPRINT_BITS,
};
pub use matcher::{best_match, search, SearchResult};
pub use similarity::{hamming_distance, histogram_correlation, similarity, try_similarity};

// Network-dependent exports
#[cfg(feature = "network")]
pub use catalog::{CatalogStore, InMemoryCatalog};
#[cfg(feature = "network")]
pub use config::EngineConfig;
#[cfg(feature = "network")]
pub use engine::{SearchEngine, SearchRequest};
#[cfg(feature = "network")]
pub use fetch::{
    fetch_with_retry, HttpFetcher, HttpFetcherConfig, ImageFetcher, LocalFetcher, MockFetcher,
    MockResponse, RetryPolicy, RoutingFetcher,
};
#[cfg(feature = "network")]
pub use pipeline::{
    FingerprintPipeline, ImageFailure, ItemReport, ItemStatus, PipelineOptions, PipelineReport,
    ProgressSnapshot, ShutdownHandle, SkipReason,
};

#[cfg(all(test, feature = "network"))]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use std::sync::Arc;

    fn product_photo() -> Vec<u8> {
        let img = RgbImage::from_fn(96, 64, |x, y| {
            if (20..70).contains(&x) && (10..50).contains(&y) {
                Rgb([200, 40, 40])
            } else {
                Rgb([240, 240, 240])
            }
        });
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    /// Integration test: fingerprint a catalog, then find the product by its photo.
    #[tokio::test]
    async fn test_fingerprint_then_search_workflow() {
        let url = "https://cdn.example.com/red-box.png";
        let catalog = Arc::new(InMemoryCatalog::from_items([
            CatalogItem::new("red-box", vec![url.to_string()]),
            CatalogItem::new("no-photos", vec![]),
        ]));
        let fetcher = Arc::new(MockFetcher::new().with_bytes(url, product_photo()));
        let engine = SearchEngine::new(catalog.clone(), fetcher);

        // Step 1: Populate fingerprints
        let report = engine.fingerprint_all(PipelineOptions::default()).await;
        assert_eq!(report.processed, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 0);

        let stats = engine.stats().await.unwrap();
        assert_eq!(stats.coverage_percent, 50.0);

        // Step 2: Query with the same photo
        let results = engine
            .search(&product_photo(), &SearchRequest::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].item_id, "red-box");
        assert_eq!(results[0].similarity, 100.0);
        assert_eq!(results[0].matched_image_url, url);

        // Step 3: A second run skips the now-fingerprinted item
        let rerun = engine.fingerprint_all(PipelineOptions::default()).await;
        assert_eq!(rerun.processed, 0);
        assert_eq!(rerun.skipped, 2);
    }
}
