//! Catalog snapshots on disk.
//!
//! A snapshot is the full item list serialized as JSON or CBOR. Loading tries
//! CBOR first, then JSON, so either format can be handed to the same reader.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::CatalogItem;
use crate::error::StoreError;

/// On-disk encoding of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotFormat {
    #[default]
    Json,
    Cbor,
}

impl SnapshotFormat {
    /// `.cbor` files are CBOR, everything else JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("cbor") => Self::Cbor,
            _ => Self::Json,
        }
    }
}

/// Every item of a catalog, with its persisted fingerprints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub items: Vec<CatalogItem>,
}

impl CatalogSnapshot {
    pub fn new(items: Vec<CatalogItem>) -> Self {
        Self { items }
    }

    /// Parse snapshot bytes, trying CBOR first then JSON.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        if let Ok(snapshot) = ciborium::from_reader::<Self, _>(bytes) {
            debug!(format = "cbor", items = snapshot.items.len(), "Parsed snapshot");
            return Ok(snapshot);
        }

        let snapshot: Self = serde_json::from_slice(bytes).map_err(|e| {
            StoreError::Serialization(format!("Failed to parse snapshot (tried CBOR and JSON): {e}"))
        })?;
        debug!(format = "json", items = snapshot.items.len(), "Parsed snapshot");
        Ok(snapshot)
    }

    pub fn to_bytes(&self, format: SnapshotFormat) -> Result<Vec<u8>, StoreError> {
        match format {
            SnapshotFormat::Json => serde_json::to_vec_pretty(self)
                .map_err(|e| StoreError::Serialization(format!("JSON encoding failed: {e}"))),
            SnapshotFormat::Cbor => {
                let mut buffer = Vec::new();
                ciborium::into_writer(self, &mut buffer)
                    .map_err(|e| StoreError::Serialization(format!("CBOR encoding failed: {e}")))?;
                Ok(buffer)
            }
        }
    }

    pub fn read_from(path: &Path) -> Result<Self, StoreError> {
        let bytes = std::fs::read(path).map_err(|e| {
            StoreError::Io(format!("Failed to read catalog {}: {e}", path.display()))
        })?;
        Self::from_bytes(&bytes)
    }

    /// Write the snapshot in the format implied by the file extension.
    pub fn write_to(&self, path: &Path) -> Result<(), StoreError> {
        let bytes = self.to_bytes(SnapshotFormat::from_path(path))?;
        std::fs::write(path, bytes).map_err(|e| {
            StoreError::Io(format!("Failed to write catalog {}: {e}", path.display()))
        })
    }
}
