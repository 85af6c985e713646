//! Batch fingerprinting pipeline.
//!
//! Populates the catalog's stored fingerprints. Items are read in pages of
//! `batch_size`; within a page up to `max_concurrent` items are processed at
//! once, each holding a semaphore permit for its whole lifetime.
//!
//! Per item:
//!
//! ```text
//! Pending -> Fetching -> Fingerprinting -> Persisted
//! Pending -> Skipped
//! Pending -> ... -> Failed
//! ```
//!
//! An image that cannot be fetched or decoded is recorded against that image
//! only; the item still persists whatever images did succeed. An item with no
//! successful image is reported failed and the run carries on. A run never
//! returns an error, only a [`PipelineReport`].

mod report;

pub use report::{
    ImageFailure, ItemReport, ItemStatus, PipelineProgress, PipelineReport, ProgressSnapshot,
    ShutdownHandle, SkipReason,
};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::catalog::{CatalogImageRecord, CatalogItem, CatalogStore};
use crate::fetch::{fetch_with_retry, ImageFetcher, RetryPolicy};
use crate::fingerprint::{analyze_image, ImageAnalysis};

/// Default number of items read from the catalog per page.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Default number of items processed at once.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Default pause between two images of the same item.
pub const DEFAULT_IMAGE_DELAY: Duration = Duration::from_millis(100);

/// Options for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Recompute fingerprints even for items that already have them.
    pub force_regenerate: bool,
    pub batch_size: usize,
    pub max_concurrent: usize,
    /// Skip items that already have fingerprints (unless forced).
    pub skip_existing: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            force_regenerate: false,
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            skip_existing: true,
        }
    }
}

impl PipelineOptions {
    /// Why `item` should not be processed, if it should not.
    pub fn skip_reason(&self, item: &CatalogItem) -> Option<SkipReason> {
        if item.has_fingerprints() && self.skip_existing && !self.force_regenerate {
            return Some(SkipReason::AlreadyFingerprinted);
        }
        if item.images.is_empty() {
            return Some(SkipReason::NoImages);
        }
        None
    }

    /// Clamp sizes to at least one.
    fn normalized(self) -> Self {
        Self {
            batch_size: self.batch_size.max(1),
            max_concurrent: self.max_concurrent.max(1),
            ..self
        }
    }
}

/// Everything a worker task needs, cheap to clone into each task.
#[derive(Clone)]
struct Worker {
    store: Arc<dyn CatalogStore>,
    fetcher: Arc<dyn ImageFetcher>,
    retry: RetryPolicy,
    image_delay: Duration,
}

impl Worker {
    #[instrument(level = "debug", skip(self, item), fields(item_id = %item.id, images = item.images.len()))]
    async fn process(&self, item: CatalogItem) -> ItemReport {
        let mut records = Vec::with_capacity(item.images.len());
        let mut failures = Vec::new();

        for (index, url) in item.images.iter().enumerate() {
            if index > 0 && !self.image_delay.is_zero() {
                tokio::time::sleep(self.image_delay).await;
            }

            debug!(url = %url, state = "fetching", "Fetching image");
            let (fetched, attempts) =
                fetch_with_retry(self.fetcher.as_ref(), url, &self.retry).await;
            let bytes = match fetched {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(url = %url, attempts, error = %e, "Image fetch failed");
                    failures.push(ImageFailure {
                        item_id: item.id.clone(),
                        image_url: url.clone(),
                        reason: e.to_string(),
                        attempts,
                    });
                    continue;
                }
            };

            debug!(url = %url, bytes = bytes.len(), state = "fingerprinting", "Fingerprinting image");
            match fingerprint_bytes(bytes).await {
                Ok(analysis) => records.push(CatalogImageRecord::from_analysis(url.clone(), analysis)),
                Err(reason) => {
                    warn!(url = %url, error = %reason, "Image fingerprinting failed");
                    failures.push(ImageFailure {
                        item_id: item.id.clone(),
                        image_url: url.clone(),
                        reason,
                        attempts,
                    });
                }
            }
        }

        if records.is_empty() {
            return ItemReport::failed(item.id, "no images could be fingerprinted", failures);
        }

        let count = records.len();
        match self.store.persist_fingerprints(&item.id, records).await {
            Ok(()) => {
                debug!(state = "persisted", records = count, "Fingerprints persisted");
                ItemReport::persisted(item.id, count, failures)
            }
            Err(e) => {
                warn!(error = %e, "Failed to persist fingerprints");
                ItemReport::failed(item.id, format!("failed to persist fingerprints: {e}"), failures)
            }
        }
    }
}

/// Decode and fingerprint on the blocking pool; image work is CPU-bound.
async fn fingerprint_bytes(bytes: Vec<u8>) -> Result<ImageAnalysis, String> {
    match tokio::task::spawn_blocking(move || analyze_image(&bytes)).await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(e) => Err(format!("fingerprinting task failed: {e}")),
    }
}

/// Runs fingerprinting over a catalog.
///
/// Runs on the same pipeline are serialized; a second call waits for the
/// first to finish.
pub struct FingerprintPipeline {
    worker: Worker,
    progress: Arc<PipelineProgress>,
    shutdown: ShutdownHandle,
    run_lock: Mutex<()>,
}

impl FingerprintPipeline {
    pub fn new(store: Arc<dyn CatalogStore>, fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            worker: Worker {
                store,
                fetcher,
                retry: RetryPolicy::default(),
                image_delay: DEFAULT_IMAGE_DELAY,
            },
            progress: Arc::new(PipelineProgress::default()),
            shutdown: ShutdownHandle::new(),
            run_lock: Mutex::new(()),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.worker.retry = retry;
        self
    }

    pub fn with_image_delay(mut self, delay: Duration) -> Self {
        self.worker.image_delay = delay;
        self
    }

    /// Share an externally owned shutdown handle.
    pub fn with_shutdown(mut self, shutdown: ShutdownHandle) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Live counters of the current (or last) run.
    pub fn progress(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    /// Fingerprint every item of the catalog.
    #[instrument(level = "info", skip(self), fields(
        batch_size = options.batch_size,
        max_concurrent = options.max_concurrent,
        force = options.force_regenerate
    ))]
    pub async fn fingerprint_all(&self, options: PipelineOptions) -> PipelineReport {
        let _guard = self.run_lock.lock().await;
        let options = options.normalized();
        let started_at = Utc::now();
        self.progress.begin();

        let semaphore = Arc::new(Semaphore::new(options.max_concurrent));
        let mut items = Vec::new();
        let mut store_errors = Vec::new();
        let mut interrupted = false;
        let mut offset = 0;

        info!("Starting batch fingerprinting");
        loop {
            if self.shutdown.is_requested() {
                interrupted = true;
                break;
            }

            let page = match self.worker.store.list_page(offset, options.batch_size).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(offset, error = %e, "Failed to read catalog page");
                    store_errors.push(e.to_string());
                    break;
                }
            };
            if page.is_empty() {
                break;
            }

            let page_len = page.len();
            offset += page_len;
            debug!(offset, page_len, "Processing page");

            let (reports, stopped) = self.run_page(page, &options, &semaphore).await;
            items.extend(reports);
            if stopped {
                interrupted = true;
                break;
            }
            if page_len < options.batch_size {
                break;
            }
        }

        self.progress.finish();
        let report = PipelineReport::build(
            started_at,
            self.progress.snapshot(),
            items,
            store_errors,
            interrupted,
        );

        info!(
            processed = report.processed,
            failed = report.failed,
            skipped = report.skipped,
            image_failures = report.image_failures.len(),
            interrupted = report.interrupted,
            duration_ms = report.duration_ms,
            "Batch fingerprinting finished"
        );
        report
    }

    /// Fingerprint a single item.
    ///
    /// Existing fingerprints are kept unless `force_regenerate` is set. An
    /// unknown id yields a report with one failed item.
    #[instrument(level = "info", skip(self))]
    pub async fn fingerprint_item(&self, item_id: &str, force_regenerate: bool) -> PipelineReport {
        let _guard = self.run_lock.lock().await;
        let options = PipelineOptions {
            force_regenerate,
            batch_size: 1,
            max_concurrent: 1,
            skip_existing: true,
        };
        let started_at = Utc::now();
        self.progress.begin();

        let mut store_errors = Vec::new();
        let item_report = match self.worker.store.get_item(item_id).await {
            Ok(Some(item)) => match options.skip_reason(&item) {
                Some(reason) => ItemReport::skipped(item.id, reason),
                None => self.worker.process(item).await,
            },
            Ok(None) => ItemReport::failed(item_id, "item not found", Vec::new()),
            Err(e) => {
                store_errors.push(e.to_string());
                ItemReport::failed(item_id, format!("catalog lookup failed: {e}"), Vec::new())
            }
        };
        self.progress.record(&item_report);
        self.progress.finish();

        PipelineReport::build(
            started_at,
            self.progress.snapshot(),
            vec![item_report],
            store_errors,
            false,
        )
    }

    /// Process one page. Returns the item reports and whether shutdown cut
    /// the page short.
    async fn run_page(
        &self,
        page: Vec<CatalogItem>,
        options: &PipelineOptions,
        semaphore: &Arc<Semaphore>,
    ) -> (Vec<ItemReport>, bool) {
        let mut reports = Vec::with_capacity(page.len());
        let mut tasks = JoinSet::new();
        let mut pending = HashSet::new();
        let mut stopped = false;

        for item in page {
            if self.shutdown.is_requested() {
                stopped = true;
                break;
            }

            if let Some(reason) = options.skip_reason(&item) {
                debug!(item_id = %item.id, ?reason, "Skipping item");
                let report = ItemReport::skipped(item.id, reason);
                self.progress.record(&report);
                reports.push(report);
                continue;
            }

            // Blocks until a slot frees up.
            let Ok(permit) = Arc::clone(semaphore).acquire_owned().await else {
                stopped = true;
                break;
            };
            if self.shutdown.is_requested() {
                stopped = true;
                break;
            }

            let worker = self.worker.clone();
            let progress = Arc::clone(&self.progress);
            pending.insert(item.id.clone());
            tasks.spawn(async move {
                let _permit = permit;
                let report = worker.process(item).await;
                progress.record(&report);
                report
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => {
                    pending.remove(&report.item_id);
                    reports.push(report);
                }
                Err(e) => warn!(error = %e, "Worker task failed"),
            }
        }

        // Items whose task died without reporting.
        for item_id in pending {
            let report = ItemReport::failed(item_id, "worker task panicked", Vec::new());
            self.progress.record(&report);
            reports.push(report);
        }

        (reports, stopped)
    }
}
