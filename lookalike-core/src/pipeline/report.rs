//! Pipeline outcomes and live progress.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why an item was not processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Fingerprints already persisted and regeneration was not forced.
    AlreadyFingerprinted,
    /// The item has no image URLs.
    NoImages,
}

/// Final state of one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    /// Fingerprints for `images` photos were written to the store.
    Persisted { images: usize },
    Skipped { reason: SkipReason },
    Failed { reason: String },
}

/// One image that could not be fingerprinted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFailure {
    pub item_id: String,
    pub image_url: String,
    pub reason: String,
    /// Fetch attempts made, including the first.
    pub attempts: u32,
}

/// Outcome of one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReport {
    pub item_id: String,
    #[serde(flatten)]
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_failures: Vec<ImageFailure>,
}

impl ItemReport {
    pub fn persisted(item_id: impl Into<String>, images: usize, failures: Vec<ImageFailure>) -> Self {
        Self {
            item_id: item_id.into(),
            status: ItemStatus::Persisted { images },
            image_failures: failures,
        }
    }

    pub fn skipped(item_id: impl Into<String>, reason: SkipReason) -> Self {
        Self {
            item_id: item_id.into(),
            status: ItemStatus::Skipped { reason },
            image_failures: Vec::new(),
        }
    }

    pub fn failed(
        item_id: impl Into<String>,
        reason: impl Into<String>,
        failures: Vec<ImageFailure>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            status: ItemStatus::Failed {
                reason: reason.into(),
            },
            image_failures: failures,
        }
    }
}

/// Summary of a pipeline run.
///
/// Counts are exact; `items` may be in any order since items run
/// concurrently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub processed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub items: Vec<ItemReport>,
    /// Every per-image failure across all items.
    pub image_failures: Vec<ImageFailure>,
    /// Catalog errors that stopped paging early.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub store_errors: Vec<String>,
    /// Shutdown was requested before every item was started.
    pub interrupted: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl PipelineReport {
    pub(crate) fn build(
        started_at: DateTime<Utc>,
        counts: ProgressSnapshot,
        items: Vec<ItemReport>,
        store_errors: Vec<String>,
        interrupted: bool,
    ) -> Self {
        let finished_at = Utc::now();
        let image_failures = items
            .iter()
            .flat_map(|item| item.image_failures.iter().cloned())
            .collect();

        Self {
            processed: counts.processed,
            failed: counts.failed,
            skipped: counts.skipped,
            items,
            image_failures,
            store_errors,
            interrupted,
            started_at,
            finished_at,
            duration_ms: (finished_at - started_at).num_milliseconds().max(0) as u64,
        }
    }

    /// Total items with a final outcome.
    pub fn total(&self) -> usize {
        self.processed + self.failed + self.skipped
    }

    pub fn item(&self, item_id: &str) -> Option<&ItemReport> {
        self.items.iter().find(|item| item.item_id == item_id)
    }
}

/// Counters shared by every worker of a run.
#[derive(Debug, Default)]
pub struct PipelineProgress {
    running: AtomicBool,
    processed: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
    image_failures: AtomicUsize,
}

/// Point-in-time copy of [`PipelineProgress`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub running: bool,
    pub processed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub image_failures: usize,
}

impl PipelineProgress {
    pub(crate) fn begin(&self) {
        self.processed.store(0, Ordering::SeqCst);
        self.failed.store(0, Ordering::SeqCst);
        self.skipped.store(0, Ordering::SeqCst);
        self.image_failures.store(0, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
    }

    pub(crate) fn finish(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub(crate) fn record(&self, report: &ItemReport) {
        let counter = match report.status {
            ItemStatus::Persisted { .. } => &self.processed,
            ItemStatus::Skipped { .. } => &self.skipped,
            ItemStatus::Failed { .. } => &self.failed,
        };
        counter.fetch_add(1, Ordering::SeqCst);
        self.image_failures
            .fetch_add(report.image_failures.len(), Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            running: self.running.load(Ordering::SeqCst),
            processed: self.processed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
            image_failures: self.image_failures.load(Ordering::SeqCst),
        }
    }
}

/// Requests a graceful stop: no new items start, in-flight items finish.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(item: &str, url: &str) -> ImageFailure {
        ImageFailure {
            item_id: item.into(),
            image_url: url.into(),
            reason: "Image not found".into(),
            attempts: 1,
        }
    }

    #[test]
    fn test_progress_counts_by_status() {
        let progress = PipelineProgress::default();
        progress.begin();
        progress.record(&ItemReport::persisted("a", 2, vec![failure("a", "2.jpg")]));
        progress.record(&ItemReport::skipped("b", SkipReason::NoImages));
        progress.record(&ItemReport::failed("c", "no images could be fingerprinted", vec![]));

        let snapshot = progress.snapshot();
        assert!(snapshot.running);
        assert_eq!(snapshot.processed, 1);
        assert_eq!(snapshot.skipped, 1);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.image_failures, 1);

        progress.finish();
        assert!(!progress.snapshot().running);

        progress.begin();
        assert_eq!(progress.snapshot().processed, 0);
    }

    #[test]
    fn test_report_collects_image_failures() {
        let items = vec![
            ItemReport::persisted("a", 1, vec![failure("a", "x.jpg")]),
            ItemReport::failed("b", "boom", vec![failure("b", "y.jpg"), failure("b", "z.jpg")]),
        ];
        let counts = ProgressSnapshot {
            processed: 1,
            failed: 1,
            ..Default::default()
        };
        let report = PipelineReport::build(Utc::now(), counts, items, vec![], false);

        assert_eq!(report.total(), 2);
        assert_eq!(report.image_failures.len(), 3);
        assert!(report.item("b").is_some());
        assert!(report.item("zzz").is_none());
    }

    #[test]
    fn test_item_report_json_shape() {
        let json = serde_json::to_value(ItemReport::skipped("a", SkipReason::AlreadyFingerprinted))
            .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "item_id": "a",
                "status": "skipped",
                "reason": "already_fingerprinted"
            })
        );
    }

    #[test]
    fn test_shutdown_handle_shared() {
        let handle = ShutdownHandle::new();
        let clone = handle.clone();
        assert!(!clone.is_requested());
        handle.request();
        assert!(clone.is_requested());
    }
}
