//! Filesystem image fetcher for `file://` URLs and plain paths.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{ImageFetcher, DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_IMAGE_BYTES};
use crate::error::FetchError;

/// Reads images from local disk with the same timeout and size cap as the
/// HTTP fetcher.
///
/// Relative paths are resolved against the base directory when one is set,
/// otherwise against the working directory.
#[derive(Debug, Clone)]
pub struct LocalFetcher {
    timeout: Duration,
    max_bytes: u64,
    base_dir: Option<PathBuf>,
}

impl Default for LocalFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_IMAGE_BYTES)
    }
}

impl LocalFetcher {
    pub fn new(timeout: Duration, max_bytes: u64) -> Self {
        Self {
            timeout,
            max_bytes,
            base_dir: None,
        }
    }

    /// Resolve relative paths against `dir`, typically the catalog's folder.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    async fn read(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let path = self.resolve(url);

        let metadata = tokio::fs::metadata(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => FetchError::NotFound(url.to_string()),
            _ => FetchError::NetworkError(format!("{url}: {e}")),
        })?;
        if !metadata.is_file() {
            return Err(FetchError::NotFound(url.to_string()));
        }
        if metadata.len() > self.max_bytes {
            return Err(FetchError::TooLarge {
                size: metadata.len(),
                limit: self.max_bytes,
            });
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| FetchError::NetworkError(format!("{url}: {e}")))?;
        debug!(path = %path.display(), bytes = bytes.len(), "Read local image");
        Ok(bytes)
    }
}

#[async_trait]
impl ImageFetcher for LocalFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        tokio::time::timeout(self.timeout, self.read(url))
            .await
            .map_err(|_| FetchError::Timeout(url.to_string()))?
    }
}
