//! Retry policy for image fetches.
//!
//! A [`RetryPolicy`] is a plain value describing how many times to retry and
//! how long to wait in between. [`RetryPolicy::start`] turns it into a
//! [`RetryState`], a small state machine that implements
//! [`backoff::backoff::Backoff`] and yields exactly `max_retries` delays
//! before giving up.

use std::time::{Duration, Instant};

use backoff::backoff::Backoff;
use backoff::future::retry_notify;
use tracing::{debug, warn};

use super::ImageFetcher;
use crate::error::FetchError;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Default ceiling on a single retry delay.
pub const DEFAULT_MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// How failed fetches are retried.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts are `max_retries + 1`.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Factor applied to the delay after each retry (1.0 = fixed delay).
    pub multiplier: f64,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY)
    }
}

impl RetryPolicy {
    /// Same delay before every retry.
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay: delay,
            multiplier: 1.0,
            max_delay: delay,
        }
    }

    /// Delay doubles after every retry, capped at [`DEFAULT_MAX_RETRY_DELAY`].
    pub fn exponential(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            multiplier: 2.0,
            max_delay: DEFAULT_MAX_RETRY_DELAY.max(initial_delay),
        }
    }

    /// Never retry.
    pub fn none() -> Self {
        Self::fixed(0, Duration::ZERO)
    }

    /// Delay before retry number `retry` (0-based), or `None` once retries
    /// are exhausted.
    pub fn delay_for(&self, retry: u32) -> Option<Duration> {
        if retry >= self.max_retries {
            return None;
        }
        if self.multiplier <= 1.0 {
            return Some(self.initial_delay.min(self.max_delay));
        }
        let scaled = self.initial_delay.as_secs_f64() * self.multiplier.powi(retry.min(64) as i32);
        Some(Duration::from_secs_f64(
            scaled.min(self.max_delay.as_secs_f64()),
        ))
    }

    pub fn start(&self) -> RetryState {
        RetryState {
            policy: *self,
            retries: 0,
        }
    }
}

/// Progress through a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    retries: u32,
}

impl RetryState {
    /// Retries handed out so far.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn is_exhausted(&self) -> bool {
        self.retries >= self.policy.max_retries
    }
}

impl Backoff for RetryState {
    fn reset(&mut self) {
        self.retries = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        let delay = self.policy.delay_for(self.retries)?;
        self.retries += 1;
        Some(delay)
    }
}

/// Fetch `url`, retrying transient failures according to `policy`.
///
/// Returns the bytes together with the number of attempts made, or the last
/// error and the attempt count once the policy gives up. Permanent errors
/// ([`FetchError::is_transient`] is false) are not retried.
pub async fn fetch_with_retry(
    fetcher: &dyn ImageFetcher,
    url: &str,
    policy: &RetryPolicy,
) -> (Result<Vec<u8>, FetchError>, u32) {
    let start = Instant::now();
    let mut attempts = 0u32;

    let result = retry_notify(
        policy.start(),
        || {
            attempts += 1;
            async move {
                fetcher.fetch(url).await.map_err(|e| {
                    if e.is_transient() {
                        backoff::Error::transient(e)
                    } else {
                        backoff::Error::permanent(e)
                    }
                })
            }
        },
        |err: FetchError, duration: Duration| {
            warn!(
                url,
                error = %err,
                retry_after_ms = duration.as_millis() as u64,
                "Retry scheduled"
            );
        },
    )
    .await;

    debug!(
        url,
        attempts,
        ok = result.is_ok(),
        latency_ms = start.elapsed().as_millis() as u64,
        "Fetch finished"
    );

    (result, attempts)
}
