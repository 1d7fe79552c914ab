// SPDX-License-Identifier: Apache-2.0

//! GitHub API rate limit status.
//!
//! Decodes the `/rate_limit` payload that [`QuotaTracker`](crate::quota::QuotaTracker)
//! uses to refill its budgets.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::fetch::FetchError;

/// Remaining allowance for one rate limit bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateLimitBucket {
    /// Number of calls remaining in the current window.
    pub remaining: u32,
    /// Total number of calls allowed in the window.
    #[serde(default)]
    pub limit: u32,
    /// Unix timestamp when the window resets.
    #[serde(default)]
    pub reset: u64,
}

impl RateLimitBucket {
    /// When the window resets, if the server reported it.
    #[must_use]
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        if self.reset == 0 {
            return None;
        }
        DateTime::from_timestamp(i64::try_from(self.reset).ok()?, 0)
    }
}

/// GitHub API rate limit status for the buckets the engine meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    /// Core REST API bucket.
    pub core: RateLimitBucket,
    /// Search API bucket.
    pub search: RateLimitBucket,
}

#[derive(Deserialize)]
struct RateLimitResponse {
    resources: Resources,
}

#[derive(Deserialize)]
struct Resources {
    core: RateLimitBucket,
    search: RateLimitBucket,
}

impl RateLimitStatus {
    /// Decodes a `/rate_limit` response body.
    pub fn from_payload(payload: &Value) -> Result<Self, FetchError> {
        let response = RateLimitResponse::deserialize(payload)
            .map_err(|e| FetchError::Malformed(format!("rate limit payload: {e}")))?;

        Ok(Self {
            core: response.resources.core,
            search: response.resources.search,
        })
    }

    /// Returns true if the core allowance is low (remaining < 100).
    #[must_use]
    pub fn is_low(&self) -> bool {
        self.core.remaining < 100
    }

    /// Returns a human-readable status message.
    #[must_use]
    pub fn message(&self) -> String {
        let mut message = format!(
            "GitHub API: {}/{} core calls, {}/{} search calls remaining",
            self.core.remaining, self.core.limit, self.search.remaining, self.search.limit
        );
        if let Some(reset) = self.core.reset_at() {
            message.push_str(&format!(
                " (core resets at {})",
                reset.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::rate_limit_body;

    #[test]
    fn test_from_payload() {
        let status = RateLimitStatus::from_payload(&rate_limit_body(4200, 28)).unwrap();
        assert_eq!(status.core.remaining, 4200);
        assert_eq!(status.core.limit, 5000);
        assert_eq!(status.search.remaining, 28);
    }

    #[test]
    fn test_from_payload_minimal_buckets() {
        let payload = json!({"resources": {"core": {"remaining": 1}, "search": {"remaining": 2}}});
        let status = RateLimitStatus::from_payload(&payload).unwrap();
        assert_eq!(status.core.remaining, 1);
        assert_eq!(status.core.limit, 0);
        assert_eq!(status.search.remaining, 2);
    }

    #[test]
    fn test_from_payload_missing_search_is_malformed() {
        let payload = json!({"resources": {"core": {"remaining": 1}}});
        assert!(matches!(
            RateLimitStatus::from_payload(&payload),
            Err(FetchError::Malformed(_))
        ));
    }

    #[test]
    fn test_from_payload_negative_is_malformed() {
        let payload = json!({"resources": {"core": {"remaining": -1}, "search": {"remaining": 2}}});
        assert!(RateLimitStatus::from_payload(&payload).is_err());
    }

    #[test]
    fn test_rate_limit_status_is_low_boundary() {
        let mut status = RateLimitStatus::from_payload(&rate_limit_body(100, 30)).unwrap();
        assert!(!status.is_low());
        status.core.remaining = 99;
        assert!(status.is_low());
    }

    #[test]
    fn test_rate_limit_status_message() {
        let status = RateLimitStatus::from_payload(&rate_limit_body(42, 7)).unwrap();
        assert_eq!(
            status.message(),
            "GitHub API: 42/5000 core calls, 7/30 search calls remaining \
             (core resets at 2023-11-14 22:13:20 UTC)"
        );
    }

    #[test]
    fn test_message_without_reset_time() {
        let payload = json!({"resources": {"core": {"remaining": 1}, "search": {"remaining": 2}}});
        let status = RateLimitStatus::from_payload(&payload).unwrap();
        assert_eq!(status.core.reset_at(), None);
        assert_eq!(
            status.message(),
            "GitHub API: 1/0 core calls, 2/0 search calls remaining"
        );
    }
}
