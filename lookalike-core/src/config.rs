//! Engine configuration
//!
//! Handles loading configuration from environment variables with sensible defaults.

use std::time::Duration;

use crate::catalog::CandidateFilter;
use crate::engine::SearchRequest;
use crate::fetch::{HttpFetcherConfig, RetryPolicy};
use crate::pipeline::PipelineOptions;

/// Engine configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Minimum similarity for a search result (default: 60)
    pub search_threshold: f64,
    /// Maximum number of search results (default: 20)
    pub search_limit: usize,
    /// Catalog items read per page (default: 50)
    pub batch_size: usize,
    /// Items fingerprinted at once (default: 5)
    pub max_concurrent: usize,
    /// Timeout for one image fetch in seconds (default: 15)
    pub fetch_timeout_secs: u64,
    /// Largest accepted image in MB (default: 10)
    pub max_image_mb: u64,
    /// Retries after a transient fetch failure (default: 3)
    pub fetch_retries: u32,
    /// Delay before the first retry in milliseconds (default: 500)
    pub retry_delay_ms: u64,
    /// Pause between images of one item in milliseconds (default: 100)
    pub image_delay_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            search_threshold: 60.0,
            search_limit: 20,
            batch_size: 50,
            max_concurrent: 5,
            fetch_timeout_secs: 15,
            max_image_mb: 10,
            fetch_retries: 3,
            retry_delay_ms: 500,
            image_delay_ms: 100,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Unset or unparsable values fall back to the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let search_threshold = lookup("LOOKALIKE_SEARCH_THRESHOLD")
            .and_then(|v| v.parse().ok())
            .filter(|t: &f64| (0.0..=100.0).contains(t))
            .unwrap_or(defaults.search_threshold);

        let search_limit = lookup("LOOKALIKE_SEARCH_LIMIT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.search_limit);

        let batch_size = lookup("LOOKALIKE_BATCH_SIZE")
            .and_then(|v| v.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.batch_size);

        let max_concurrent = lookup("LOOKALIKE_MAX_CONCURRENT")
            .and_then(|v| v.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_concurrent);

        let fetch_timeout_secs = lookup("LOOKALIKE_FETCH_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.fetch_timeout_secs);

        let max_image_mb = lookup("LOOKALIKE_MAX_IMAGE_MB")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_image_mb);

        let fetch_retries = lookup("LOOKALIKE_FETCH_RETRIES")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.fetch_retries);

        let retry_delay_ms = lookup("LOOKALIKE_RETRY_DELAY_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.retry_delay_ms);

        let image_delay_ms = lookup("LOOKALIKE_IMAGE_DELAY_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.image_delay_ms);

        Self {
            search_threshold,
            search_limit,
            batch_size,
            max_concurrent,
            fetch_timeout_secs,
            max_image_mb,
            fetch_retries,
            retry_delay_ms,
            image_delay_ms,
        }
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            batch_size: self.batch_size,
            max_concurrent: self.max_concurrent,
            ..Default::default()
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(self.fetch_retries, Duration::from_millis(self.retry_delay_ms))
    }

    pub fn image_delay(&self) -> Duration {
        Duration::from_millis(self.image_delay_ms)
    }

    pub fn http_fetcher_config(&self) -> HttpFetcherConfig {
        HttpFetcherConfig {
            timeout: Duration::from_secs(self.fetch_timeout_secs),
            max_bytes: self.max_image_mb.saturating_mul(1024 * 1024),
            ..Default::default()
        }
    }

    /// Search parameters with the configured defaults and active items only.
    pub fn search_request(&self) -> SearchRequest {
        SearchRequest {
            threshold: self.search_threshold,
            limit: self.search_limit,
            filter: CandidateFilter::default(),
        }
    }
}
