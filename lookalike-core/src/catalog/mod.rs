//! Catalog data model and the store seam.
//!
//! The catalog itself (prices, stock, categories) lives outside this crate.
//! The engine needs read access to candidate items with their stored
//! fingerprints and write access to persist freshly computed ones; both go
//! through [`CatalogStore`].

#[cfg(feature = "network")]
mod memory;
mod snapshot;

#[cfg(feature = "network")]
pub use memory::InMemoryCatalog;
pub use snapshot::{CatalogSnapshot, SnapshotFormat};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fingerprint::{ColorHistogram, FingerprintSet, ImageAnalysis, ImageMetadata};

#[cfg(feature = "network")]
use async_trait::async_trait;

#[cfg(feature = "network")]
use crate::error::StoreError;

/// Fingerprints and descriptive data for one product photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogImageRecord {
    pub image_url: String,
    pub fingerprints: FingerprintSet,
    pub histogram: ColorHistogram,
    pub metadata: ImageMetadata,
    pub created_at: DateTime<Utc>,
}

impl CatalogImageRecord {
    /// Build a record from a fresh analysis, stamped now.
    pub fn from_analysis(image_url: impl Into<String>, analysis: ImageAnalysis) -> Self {
        Self {
            image_url: image_url.into(),
            fingerprints: analysis.fingerprints,
            histogram: analysis.histogram,
            metadata: analysis.metadata,
            created_at: Utc::now(),
        }
    }
}

/// A product as seen by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub stock: u32,
    /// Source URLs (or paths) of the product photos.
    #[serde(default)]
    pub images: Vec<String>,
    /// Persisted fingerprint records, one per successfully processed photo.
    #[serde(default)]
    pub fingerprints: Vec<CatalogImageRecord>,
}

fn default_active() -> bool {
    true
}

impl CatalogItem {
    pub fn new(id: impl Into<String>, images: Vec<String>) -> Self {
        Self {
            id: id.into(),
            is_active: true,
            category: None,
            price: 0.0,
            stock: 0,
            images,
            fingerprints: Vec::new(),
        }
    }

    /// Whether at least one fingerprint record is persisted.
    pub fn has_fingerprints(&self) -> bool {
        !self.fingerprints.is_empty()
    }
}

/// Which catalog items are eligible as search candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateFilter {
    pub active_only: bool,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub in_stock_only: bool,
}

impl Default for CandidateFilter {
    /// Active items of any category, price and stock level.
    fn default() -> Self {
        Self {
            active_only: true,
            ..Self::all()
        }
    }
}

impl CandidateFilter {
    /// A filter that accepts every item.
    pub fn all() -> Self {
        Self {
            active_only: false,
            category: None,
            min_price: None,
            max_price: None,
            in_stock_only: false,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn matches(&self, item: &CatalogItem) -> bool {
        if self.active_only && !item.is_active {
            return false;
        }
        if self.in_stock_only && item.stock == 0 {
            return false;
        }
        if let Some(category) = &self.category {
            if item.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| item.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| item.price > max) {
            return false;
        }
        true
    }
}

/// Fingerprint coverage of a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub total_items: usize,
    pub items_with_fingerprints: usize,
    /// Percentage of items with at least one fingerprint, 2 decimals.
    pub coverage_percent: f64,
}

impl CatalogStats {
    pub fn new(total_items: usize, items_with_fingerprints: usize) -> Self {
        let coverage_percent = if total_items == 0 {
            0.0
        } else {
            crate::similarity::round2(items_with_fingerprints as f64 / total_items as f64 * 100.0)
        };
        Self {
            total_items,
            items_with_fingerprints,
            coverage_percent,
        }
    }
}

/// Read/write access to the catalog's fingerprint data.
///
/// Implementations must be thread-safe (`Send + Sync`); the pipeline writes
/// to disjoint items from several tasks at once.
#[cfg(feature = "network")]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Items eligible for a search, with their stored fingerprints.
    async fn list_candidates(&self, filter: &CandidateFilter)
        -> Result<Vec<CatalogItem>, StoreError>;

    /// A stable page of all items, ordered by id.
    async fn list_page(&self, offset: usize, limit: usize)
        -> Result<Vec<CatalogItem>, StoreError>;

    async fn get_item(&self, item_id: &str) -> Result<Option<CatalogItem>, StoreError>;

    /// Replace the stored fingerprint records of one item.
    async fn persist_fingerprints(
        &self,
        item_id: &str,
        records: Vec<CatalogImageRecord>,
    ) -> Result<(), StoreError>;

    async fn count_items(&self) -> Result<usize, StoreError>;

    async fn count_fingerprinted(&self) -> Result<usize, StoreError>;
}
