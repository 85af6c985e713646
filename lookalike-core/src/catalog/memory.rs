//! In-memory catalog store.
//!
//! Backs the CLI (loaded from and saved to a snapshot file) and the tests.

use std::path::Path;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use super::{CandidateFilter, CatalogImageRecord, CatalogItem, CatalogSnapshot, CatalogStore};
use crate::error::StoreError;

/// Thread-safe catalog held in a concurrent map keyed by item id.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    items: DashMap<String, CatalogItem>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: impl IntoIterator<Item = CatalogItem>) -> Self {
        let catalog = Self::new();
        for item in items {
            catalog.insert(item);
        }
        catalog
    }

    /// Load a catalog from a JSON or CBOR snapshot file.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let snapshot = CatalogSnapshot::read_from(path)?;
        debug!(path = %path.display(), items = snapshot.items.len(), "Loaded catalog");
        Ok(Self::from_items(snapshot.items))
    }

    /// Save the catalog to a snapshot file; `.cbor` selects CBOR.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        self.snapshot().write_to(path)
    }

    /// Insert or replace an item.
    pub fn insert(&self, item: CatalogItem) {
        self.items.insert(item.id.clone(), item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All items ordered by id.
    pub fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot::new(self.sorted_items())
    }

    fn sorted_items(&self) -> Vec<CatalogItem> {
        let mut items: Vec<CatalogItem> = self.items.iter().map(|e| e.value().clone()).collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        items
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn list_candidates(
        &self,
        filter: &CandidateFilter,
    ) -> Result<Vec<CatalogItem>, StoreError> {
        Ok(self
            .sorted_items()
            .into_iter()
            .filter(|item| filter.matches(item))
            .collect())
    }

    async fn list_page(&self, offset: usize, limit: usize) -> Result<Vec<CatalogItem>, StoreError> {
        Ok(self
            .sorted_items()
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn get_item(&self, item_id: &str) -> Result<Option<CatalogItem>, StoreError> {
        Ok(self.items.get(item_id).map(|e| e.value().clone()))
    }

    async fn persist_fingerprints(
        &self,
        item_id: &str,
        records: Vec<CatalogImageRecord>,
    ) -> Result<(), StoreError> {
        let mut entry = self
            .items
            .get_mut(item_id)
            .ok_or_else(|| StoreError::NotFound(item_id.to_string()))?;
        debug!(item_id, records = records.len(), "Persisting fingerprints");
        entry.fingerprints = records;
        Ok(())
    }

    async fn count_items(&self) -> Result<usize, StoreError> {
        Ok(self.items.len())
    }

    async fn count_fingerprinted(&self) -> Result<usize, StoreError> {
        Ok(self.items.iter().filter(|e| e.has_fingerprints()).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::{ColorHistogram, FingerprintSet, ImageMetadata};
    use chrono::Utc;

    fn record(url: &str) -> CatalogImageRecord {
        CatalogImageRecord {
            image_url: url.to_string(),
            fingerprints: FingerprintSet::standard_only("ff00"),
            histogram: ColorHistogram::default(),
            metadata: ImageMetadata {
                width: 1,
                height: 1,
                format: "png".into(),
                aspect_ratio: 1.0,
            },
            created_at: Utc::now(),
        }
    }

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::from_items(
            ["c", "a", "b"]
                .into_iter()
                .map(|id| CatalogItem::new(id, vec![format!("{id}.jpg")])),
        )
    }

    #[test]
    fn test_debug_lists_items() {
        let debug = format!("{:?}", catalog());
        assert!(debug.starts_with("InMemoryCatalog"));
        assert!(debug.contains("\"a.jpg\""));
    }

    #[tokio::test]
    async fn test_pages_are_ordered_by_id() {
        let catalog = catalog();
        let first = catalog.list_page(0, 2).await.unwrap();
        let second = catalog.list_page(2, 2).await.unwrap();

        let ids: Vec<_> = first.iter().chain(&second).map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert!(catalog.list_page(3, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persist_replaces_records() {
        let catalog = catalog();
        catalog
            .persist_fingerprints("a", vec![record("1.jpg"), record("2.jpg")])
            .await
            .unwrap();
        catalog
            .persist_fingerprints("a", vec![record("3.jpg")])
            .await
            .unwrap();

        let item = catalog.get_item("a").await.unwrap().unwrap();
        assert_eq!(item.fingerprints.len(), 1);
        assert_eq!(item.fingerprints[0].image_url, "3.jpg");
        assert_eq!(catalog.count_fingerprinted().await.unwrap(), 1);
        assert_eq!(catalog.count_items().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_persist_unknown_item_fails() {
        let result = catalog().persist_fingerprints("zzz", vec![]).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_candidates_applies_filter() {
        let catalog = catalog();
        let mut inactive = CatalogItem::new("d", vec![]);
        inactive.is_active = false;
        catalog.insert(inactive);

        let active = catalog
            .list_candidates(&CandidateFilter::default())
            .await
            .unwrap();
        assert_eq!(active.len(), 3);

        let all = catalog.list_candidates(&CandidateFilter::all()).await.unwrap();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");

        catalog().save(&path).unwrap();
        let loaded = InMemoryCatalog::load(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.snapshot(), catalog().snapshot());
    }
}
