// SPDX-License-Identifier: Apache-2.0

//! GitHub integration module.
//!
//! A [`GitHubSession`] puts every GitHub call behind the session's
//! [`QuotaTracker`]: a call is made only after a budget reservation in its
//! category succeeds. The submodules compute individual repository metrics on
//! top of a session.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::config::GitHubConfig;
use crate::fetch::{ApiCategory, FetchError, Page, PageFetcher};
use crate::pagination::PageSource;
use crate::quota::{Quota, QuotaTracker};

pub mod issues;
pub mod ratelimit;
pub mod releases;
pub mod repos;

/// A quota-gated connection to the GitHub REST API.
pub struct GitHubSession {
    fetcher: Arc<dyn PageFetcher>,
    quota: QuotaTracker,
    api_base: String,
    page_size: u32,
}

impl GitHubSession {
    /// Creates a session with empty budgets; the first call refreshes them.
    #[must_use]
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: &GitHubConfig) -> Self {
        Self {
            fetcher,
            quota: QuotaTracker::new(config.rate_limit_url()),
            api_base: config.api_url.trim_end_matches('/').to_string(),
            page_size: config.page_size.clamp(1, 100),
        }
    }

    /// Replaces the quota tracker.
    #[must_use]
    pub fn with_quota(mut self, quota: QuotaTracker) -> Self {
        self.quota = quota;
        self
    }

    /// Current budgets.
    #[must_use]
    pub fn quota(&self) -> Quota {
        self.quota.quota()
    }

    /// Re-reads the budgets from the rate limit endpoint.
    pub async fn refresh_quota(&mut self) -> bool {
        self.quota.refresh(self.fetcher.as_ref()).await
    }

    /// Items requested per page.
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Absolute URL for an API path such as `/search/issues`.
    #[must_use]
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    /// Absolute URL below `/repos/{owner}/{repo}`.
    #[must_use]
    pub fn repo_url(&self, owner: &str, repo: &str, path: &str) -> String {
        format!("{}/repos/{owner}/{repo}{path}", self.api_base)
    }

    /// Fetches `url` after reserving one call in `category`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::QuotaExceeded`] without calling the API when the
    /// budget is exhausted, or the fetcher's error. A quota refusal from the
    /// server zeroes the local budget of the refused category.
    pub async fn fetch(&mut self, url: &str, category: ApiCategory) -> Result<Page, FetchError> {
        if !self
            .quota
            .check_and_reserve(self.fetcher.as_ref(), category)
            .await
        {
            debug!(url, %category, "Call skipped, quota exhausted");
            return Err(FetchError::QuotaExceeded(category));
        }
        let result = self.fetcher.fetch(url, category).await;
        if let Err(FetchError::QuotaExceeded(refused)) = &result {
            self.quota.exhaust(*refused);
        }
        result
    }

    /// Addresses a listing by page number through this session.
    ///
    /// `url_for_page` builds the URL of page `n`.
    pub fn pages<B>(&mut self, category: ApiCategory, url_for_page: B) -> SessionPages<'_, B>
    where
        B: Fn(u32) -> String + Send + Sync,
    {
        SessionPages {
            session: self,
            category,
            url_for_page,
        }
    }
}

/// A listing fetched page by page through a [`GitHubSession`].
pub struct SessionPages<'s, B> {
    session: &'s mut GitHubSession,
    category: ApiCategory,
    url_for_page: B,
}

#[async_trait]
impl<'s, B> PageSource for SessionPages<'s, B>
where
    B: Fn(u32) -> String + Send + Sync,
{
    async fn page(&mut self, number: u32) -> Result<Page, FetchError> {
        let url = (self.url_for_page)(number);
        self.session.fetch(&url, self.category).await
    }

    fn page_size(&self) -> u32 {
        self.session.page_size
    }
}
