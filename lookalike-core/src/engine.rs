//! Entry points for the search service.
//!
//! [`SearchEngine`] ties the catalog store, the matcher and the
//! fingerprinting pipeline together behind the four operations an HTTP layer
//! exposes: search, fingerprint one item, fingerprint everything, stats.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::catalog::{CandidateFilter, CatalogStats, CatalogStore};
use crate::config::EngineConfig;
use crate::error::{Result, SearchError, StoreError};
use crate::fetch::ImageFetcher;
use crate::fingerprint::AverageHasher;
use crate::matcher::{self, SearchResult};
use crate::pipeline::{
    FingerprintPipeline, PipelineOptions, PipelineReport, ProgressSnapshot, ShutdownHandle,
};

/// Default minimum similarity for a result.
pub const DEFAULT_THRESHOLD: f64 = 60.0;

/// Default maximum number of results.
pub const DEFAULT_LIMIT: usize = 20;

/// Parameters of one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Minimum similarity, `0..=100`.
    pub threshold: f64,
    pub limit: usize,
    pub filter: CandidateFilter,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            limit: DEFAULT_LIMIT,
            filter: CandidateFilter::default(),
        }
    }
}

impl SearchRequest {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_filter(mut self, filter: CandidateFilter) -> Self {
        self.filter = filter;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.threshold) {
            return Err(SearchError::InvalidThreshold(self.threshold));
        }
        Ok(())
    }
}

/// Reverse image search over a catalog.
pub struct SearchEngine {
    store: Arc<dyn CatalogStore>,
    hasher: AverageHasher,
    pipeline: FingerprintPipeline,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn CatalogStore>, fetcher: Arc<dyn ImageFetcher>) -> Self {
        let pipeline = FingerprintPipeline::new(Arc::clone(&store), fetcher);
        Self {
            store,
            hasher: AverageHasher::default(),
            pipeline,
        }
    }

    /// Build an engine whose pipeline uses the configured retry and pacing.
    pub fn from_config(
        store: Arc<dyn CatalogStore>,
        fetcher: Arc<dyn ImageFetcher>,
        config: &EngineConfig,
    ) -> Self {
        let pipeline = FingerprintPipeline::new(Arc::clone(&store), fetcher)
            .with_retry_policy(config.retry_policy())
            .with_image_delay(config.image_delay());
        Self {
            store,
            hasher: AverageHasher::default(),
            pipeline,
        }
    }

    /// Find catalog items that look like the query image.
    ///
    /// The query is fingerprinted in its standard orientation only. Fails
    /// for a threshold outside `0..=100`, an undecodable query or an
    /// unavailable catalog; an empty catalog yields an empty list.
    #[instrument(level = "info", skip(self, query_bytes), fields(
        bytes = query_bytes.len(),
        threshold = request.threshold,
        limit = request.limit
    ))]
    pub async fn search(
        &self,
        query_bytes: &[u8],
        request: &SearchRequest,
    ) -> Result<Vec<SearchResult>> {
        request.validate()?;

        let query = hash_query(self.hasher, query_bytes.to_vec()).await?;
        let candidates = self.store.list_candidates(&request.filter).await?;
        debug!(candidates = candidates.len(), "Scoring candidates");

        let results = matcher::search(&query, &candidates, request.threshold, request.limit);
        info!(results = results.len(), "Search complete");
        Ok(results)
    }

    pub async fn fingerprint_item(&self, item_id: &str, force_regenerate: bool) -> PipelineReport {
        self.pipeline.fingerprint_item(item_id, force_regenerate).await
    }

    pub async fn fingerprint_all(&self, options: PipelineOptions) -> PipelineReport {
        self.pipeline.fingerprint_all(options).await
    }

    /// Fingerprint coverage of the catalog.
    pub async fn stats(&self) -> Result<CatalogStats, StoreError> {
        let total = self.store.count_items().await?;
        let fingerprinted = self.store.count_fingerprinted().await?;
        Ok(CatalogStats::new(total, fingerprinted))
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.pipeline.progress()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.pipeline.shutdown_handle()
    }
}

/// Fingerprint the query on the blocking pool, like pipeline image work.
async fn hash_query(hasher: AverageHasher, bytes: Vec<u8>) -> Result<String> {
    tokio::task::spawn_blocking(move || hasher.hash_bytes(&bytes))
        .await
        .map_err(|e| SearchError::Task(e.to_string()))?
        .map(|fingerprint| fingerprint.to_hex())
        .map_err(SearchError::from)
}
