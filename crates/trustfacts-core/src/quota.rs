// SPDX-License-Identifier: Apache-2.0

//! Call-quota budgets for a rate-limited remote API.
//!
//! A [`QuotaTracker`] owns one budget per metered [`ApiCategory`]. Budgets are
//! never computed locally: they are decremented per reserved call and
//! overwritten from the remote status endpoint whenever a budget runs dry.
//!
//! The tracker is owned by a single session and mutated through `&mut self`.
//! Sharing one tracker across concurrent tasks would need a lock per
//! category, since `check_and_reserve` is a check-then-act sequence.

use tracing::{debug, warn};

use crate::fetch::{ApiCategory, PageFetcher};
use crate::github::ratelimit::RateLimitStatus;

/// Remaining call budgets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Quota {
    /// Remaining core API calls.
    pub core_remaining: u32,
    /// Remaining search API calls.
    pub search_remaining: u32,
}

/// Tracks and refills the call budgets of one session.
#[derive(Debug, Clone)]
pub struct QuotaTracker {
    quota: Quota,
    status_url: String,
}

impl QuotaTracker {
    /// Creates a tracker with empty budgets; the first reservation refreshes.
    #[must_use]
    pub fn new(status_url: impl Into<String>) -> Self {
        Self::with_budgets(status_url, 0, 0)
    }

    /// Creates a tracker seeded with known budgets.
    #[must_use]
    pub fn with_budgets(status_url: impl Into<String>, core: u32, search: u32) -> Self {
        Self {
            quota: Quota {
                core_remaining: core,
                search_remaining: search,
            },
            status_url: status_url.into(),
        }
    }

    /// Current budgets.
    #[must_use]
    pub fn quota(&self) -> Quota {
        self.quota
    }

    /// Re-reads both budgets from the status endpoint.
    ///
    /// The status call is quota-exempt. On fetch failure or a malformed
    /// payload the budgets are left untouched and `false` is returned.
    pub async fn refresh(&mut self, fetcher: &dyn PageFetcher) -> bool {
        let page = match fetcher.fetch(&self.status_url, ApiCategory::Status).await {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, "Failed to refresh rate limit status");
                return false;
            }
        };

        let status = match page.object().and_then(RateLimitStatus::from_payload) {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "Unexpected rate limit payload");
                return false;
            }
        };

        self.quota = Quota {
            core_remaining: status.core.remaining,
            search_remaining: status.search.remaining,
        };
        debug!(
            core_remaining = self.quota.core_remaining,
            search_remaining = self.quota.search_remaining,
            "Rate limit budgets refreshed"
        );
        true
    }

    /// Reserves one call in `category`.
    ///
    /// Decrements the budget and returns `true` if it is above zero. An
    /// empty budget triggers exactly one refresh before the re-check; if the
    /// budget is still empty the reservation is denied and nothing is
    /// decremented. Status calls are never metered.
    pub async fn check_and_reserve(
        &mut self,
        fetcher: &dyn PageFetcher,
        category: ApiCategory,
    ) -> bool {
        if category == ApiCategory::Status {
            return true;
        }

        if self.remaining(category) == 0 {
            if !self.refresh(fetcher).await {
                warn!(%category, "Cannot reserve call, rate limit status unavailable");
                return false;
            }
            if self.remaining(category) == 0 {
                warn!(%category, "Rate limit reached");
                return false;
            }
        }

        let remaining = self.remaining_mut(category);
        *remaining = remaining.saturating_sub(1);
        true
    }

    /// Zeroes the budget of `category` after the server refused a call in it.
    ///
    /// The next reservation in that category refreshes before deciding.
    pub fn exhaust(&mut self, category: ApiCategory) {
        if category == ApiCategory::Status {
            return;
        }
        *self.remaining_mut(category) = 0;
        debug!(%category, "Budget exhausted by server response");
    }

    fn remaining(&self, category: ApiCategory) -> u32 {
        match category {
            ApiCategory::Core => self.quota.core_remaining,
            ApiCategory::Search => self.quota.search_remaining,
            ApiCategory::Status => u32::MAX,
        }
    }

    fn remaining_mut(&mut self, category: ApiCategory) -> &mut u32 {
        match category {
            ApiCategory::Search => &mut self.quota.search_remaining,
            ApiCategory::Core | ApiCategory::Status => &mut self.quota.core_remaining,
        }
    }
}
