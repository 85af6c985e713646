//! Retrieving catalog image bytes.
//!
//! The pipeline only needs "bytes for this URL, within a timeout and a size
//! cap"; [`ImageFetcher`] is that seam.
//!
//! - [`HttpFetcher`]: `http://` and `https://` URLs via reqwest
//! - [`LocalFetcher`]: `file://` URLs and plain filesystem paths
//! - [`RoutingFetcher`]: picks one of the above by URL scheme
//! - [`MockFetcher`]: deterministic in-memory responses for testing
//!
//! Retries are not the fetcher's concern; see [`RetryPolicy`].

mod http;
mod local;
mod mock;
mod retry;

pub use http::{HttpFetcher, HttpFetcherConfig};
pub use local::LocalFetcher;
pub use mock::{MockFetcher, MockResponse};
pub use retry::{fetch_with_retry, RetryPolicy, RetryState};

use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;

/// Default timeout for a single fetch attempt.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Default cap on the size of one image (10 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Source of raw image bytes.
///
/// Implementations must be thread-safe (`Send + Sync`) and apply their own
/// timeout and size cap to every call.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch the full body of `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Dispatches remote URLs to HTTP and everything else to the filesystem.
pub struct RoutingFetcher {
    http: HttpFetcher,
    local: LocalFetcher,
}

impl RoutingFetcher {
    pub fn new(http: HttpFetcher, local: LocalFetcher) -> Self {
        Self { http, local }
    }

    /// Build both fetchers from one HTTP configuration.
    pub fn from_config(config: HttpFetcherConfig) -> Result<Self, FetchError> {
        let local = LocalFetcher::new(config.timeout, config.max_bytes);
        Ok(Self::new(HttpFetcher::with_config(config)?, local))
    }

    /// Resolve relative local paths against `dir`.
    pub fn with_base_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.local = self.local.with_base_dir(dir);
        self
    }

    fn is_remote(url: &str) -> bool {
        let lower = url.trim_start().to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }
}

#[async_trait]
impl ImageFetcher for RoutingFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if Self::is_remote(url) {
            self.http.fetch(url).await
        } else {
            self.local.fetch(url).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_remote() {
        assert!(RoutingFetcher::is_remote("https://cdn.example.com/a.jpg"));
        assert!(RoutingFetcher::is_remote("HTTP://cdn.example.com/a.jpg"));
        assert!(!RoutingFetcher::is_remote("file:///tmp/a.jpg"));
        assert!(!RoutingFetcher::is_remote("images/a.jpg"));
    }

    #[tokio::test]
    async fn test_routes_paths_to_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, b"bytes").unwrap();

        let fetcher = RoutingFetcher::from_config(HttpFetcherConfig::default()).unwrap();
        let bytes = fetcher.fetch(path.to_str().unwrap()).await.unwrap();
        assert_eq!(bytes, b"bytes");
    }
}
