//! Mock fetcher for testing.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;

use super::ImageFetcher;
use crate::error::FetchError;

/// Canned behaviour for one URL.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Always return these bytes.
    Bytes(Vec<u8>),
    /// Always fail with this error.
    Fail(FetchError),
    /// Fail `failures` times with `error`, then return `bytes`.
    FailTimes {
        failures: u32,
        error: FetchError,
        bytes: Vec<u8>,
    },
}

/// Deterministic in-memory fetcher.
/// WARNING: Do not use in production - never touches the network!
///
/// Unknown URLs fail with [`FetchError::NotFound`]. Every call is counted so
/// tests can assert on retry behaviour.
#[derive(Debug, Default)]
pub struct MockFetcher {
    responses: HashMap<String, MockResponse>,
    calls: DashMap<String, u32>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, url: impl Into<String>, response: MockResponse) -> Self {
        self.responses.insert(url.into(), response);
        self
    }

    pub fn with_bytes(self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.with_response(url, MockResponse::Bytes(bytes))
    }

    /// Number of times `url` has been fetched.
    pub fn calls(&self, url: &str) -> u32 {
        self.calls.get(url).map(|c| *c).unwrap_or(0)
    }

    /// Total fetches across every URL.
    pub fn total_calls(&self) -> u32 {
        self.calls.iter().map(|c| *c.value()).sum()
    }

    fn record_call(&self, url: &str) -> u32 {
        let mut count = self.calls.entry(url.to_string()).or_insert(0);
        *count += 1;
        *count
    }
}

#[async_trait]
impl ImageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let call = self.record_call(url);

        match self.responses.get(url) {
            Some(MockResponse::Bytes(bytes)) => Ok(bytes.clone()),
            Some(MockResponse::Fail(error)) => Err(error.clone()),
            Some(MockResponse::FailTimes {
                failures,
                error,
                bytes,
            }) => {
                if call <= *failures {
                    Err(error.clone())
                } else {
                    Ok(bytes.clone())
                }
            }
            None => Err(FetchError::NotFound(url.to_string())),
        }
    }
}
