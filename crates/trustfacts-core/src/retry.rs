// SPDX-License-Identifier: Apache-2.0

//! Retry of transient fetch failures.
//!
//! [`RetryingFetcher`] wraps any [`PageFetcher`] and resubmits the same
//! request when it reports [`FetchError::Transient`]. A server-provided
//! `Retry-After` interval is honored (capped at
//! [`RetryPolicy::max_retry_after`]). A rate-limited response without one
//! waits [`RetryPolicy::fallback_delay`]; other transient failures use an
//! exponential backoff starting at one second. Quota denials and every other
//! error are returned immediately.

use std::time::Duration;

use async_trait::async_trait;
use backon::{BackoffBuilder, ExponentialBuilder};
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::fetch::{ApiCategory, FetchError, Page, PageFetcher};

/// Determines if an HTTP status code is retryable.
///
/// Retryable status codes are:
/// - 429 (Too Many Requests / Rate Limited)
/// - 500 (Internal Server Error)
/// - 502 (Bad Gateway)
/// - 503 (Service Unavailable)
/// - 504 (Gateway Timeout)
#[must_use]
pub fn is_retryable_http(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Bounds on retrying one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay used for rate limit responses that carry no `Retry-After`.
    pub fallback_delay: Duration,
    /// Upper bound on any single wait.
    pub max_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            fallback_delay: Duration::from_secs(30),
            max_retry_after: Duration::from_secs(120),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            fallback_delay: Duration::from_secs(config.fallback_delay_seconds),
            max_retry_after: Duration::from_secs(config.max_retry_after_seconds),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff used when the server gave no retry interval.
    ///
    /// - Factor: 2
    /// - Min delay: 1 second
    /// - Max delay: `max_retry_after`
    /// - Max times: `max_attempts - 1`
    #[must_use]
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_factor(2.0)
            .with_min_delay(Duration::from_secs(1))
            .with_max_delay(self.max_retry_after)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
    }

    /// Delay before retrying after `error`, capped at `max_retry_after`.
    #[must_use]
    pub fn delay_for(&self, error: &FetchError, backoff_delay: Duration) -> Duration {
        let delay = match (error.retry_after(), error) {
            (Some(server), _) => server,
            (None, FetchError::RateLimited { .. }) => self.fallback_delay,
            (None, _) => backoff_delay,
        };
        delay.min(self.max_retry_after)
    }
}

/// A [`PageFetcher`] that retries transient failures of an inner fetcher.
#[derive(Debug)]
pub struct RetryingFetcher<F> {
    inner: F,
    policy: RetryPolicy,
}

impl<F: PageFetcher> RetryingFetcher<F> {
    /// Wraps `inner` with `policy`.
    #[must_use]
    pub fn new(inner: F, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// Returns the active policy.
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

#[async_trait]
impl<F: PageFetcher> PageFetcher for RetryingFetcher<F> {
    async fn fetch(&self, url: &str, category: ApiCategory) -> Result<Page, FetchError> {
        let mut delays = self.policy.backoff().build();
        let mut attempt = 1;

        loop {
            match self.inner.fetch(url, category).await {
                Err(e) if e.is_transient() => {
                    let Some(backoff_delay) = delays.next() else {
                        warn!(url, attempt, error = %e, "Giving up after transient failures");
                        return Err(e);
                    };
                    let delay = self.policy.delay_for(&e, backoff_delay);
                    debug!(url, attempt, delay_secs = delay.as_secs(), error = %e, "Retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}
