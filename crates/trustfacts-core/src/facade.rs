// SPDX-License-Identifier: Apache-2.0

//! High-level entry points for the CLI and library callers.
//!
//! These functions wire credentials and configuration into HTTP fetchers,
//! build a fresh [`Aggregator`] per request, and hand back plain data. Each
//! caller supplies credentials through its own [`TokenProvider`].

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::aggregator::{Aggregator, MetricRequest};
use crate::auth::TokenProvider;
use crate::collaborators::Collaborators;
use crate::config::AppConfig;
use crate::fetch::{ApiCategory, PageFetcher};
use crate::github::GitHubSession;
use crate::github::ratelimit::RateLimitStatus;
use crate::http::HttpPageFetcher;
use crate::libraries::LibrariesClient;
use crate::retry::{RetryPolicy, RetryingFetcher};

fn github_fetcher(
    provider: &dyn TokenProvider,
    config: &AppConfig,
) -> crate::Result<Arc<dyn PageFetcher>> {
    let http = HttpPageFetcher::github(provider.github_token(), &config.github)?;
    Ok(Arc::new(RetryingFetcher::new(
        http,
        RetryPolicy::from(&config.retry),
    )))
}

/// Builds an aggregator whose sources are reached over HTTP.
///
/// # Arguments
///
/// * `provider` - Token provider for GitHub and Libraries.io credentials
/// * `config` - Endpoints, page size, and retry settings
///
/// # Errors
///
/// Returns an error if an HTTP client cannot be created.
pub fn build_aggregator(
    provider: &dyn TokenProvider,
    config: &AppConfig,
) -> crate::Result<Aggregator> {
    let policy = RetryPolicy::from(&config.retry);

    let github = GitHubSession::new(github_fetcher(provider, config)?, &config.github);

    let libraries_http = HttpPageFetcher::libraries(provider.libraries_token(), &config.libraries)?;
    let libraries = LibrariesClient::new(
        Arc::new(RetryingFetcher::new(libraries_http, policy)),
        &config.libraries,
    );

    let trends_http =
        HttpPageFetcher::anonymous(Duration::from_secs(config.stackoverflow.timeout_seconds))?;
    let trends: Arc<dyn PageFetcher> = Arc::new(RetryingFetcher::new(trends_http, policy));

    Ok(Aggregator::new(
        github,
        libraries,
        trends,
        config.stackoverflow.trends_url.clone(),
    ))
}

/// Collects the metrics named in `request`.
///
/// # Arguments
///
/// * `request` - The package and the metric names to evaluate
/// * `provider` - Token provider for API credentials
/// * `config` - Endpoints, page size, and retry settings
/// * `collaborators` - Optional sources for scraped, vulnerability, and
///   virus-scan metrics
///
/// # Returns
///
/// A JSON object holding every requested metric name, `null` for metrics
/// that could not be computed.
///
/// # Errors
///
/// Returns an error if the request has no `project_info` or an HTTP client
/// cannot be created. Individual metric failures are not errors.
#[instrument(skip_all)]
pub async fn collect(
    request: &MetricRequest,
    provider: &dyn TokenProvider,
    config: &AppConfig,
    collaborators: Collaborators,
) -> crate::Result<Map<String, Value>> {
    request.project()?;
    let mut aggregator = build_aggregator(provider, config)?.with_collaborators(collaborators);
    let output = aggregator.run(request).await?;

    let quota = aggregator.github().quota();
    debug!(
        core_remaining = quota.core_remaining,
        search_remaining = quota.search_remaining,
        "Session budgets after collection"
    );
    Ok(output)
}

/// Reads the current GitHub rate limit budgets.
///
/// The status endpoint does not count against the quota.
///
/// # Errors
///
/// Returns an error if the endpoint cannot be reached or its payload is
/// malformed.
#[instrument(skip_all)]
pub async fn quota_status(
    provider: &dyn TokenProvider,
    config: &AppConfig,
) -> crate::Result<RateLimitStatus> {
    let fetcher = github_fetcher(provider, config)?;
    let page = fetcher
        .fetch(&config.github.rate_limit_url(), ApiCategory::Status)
        .await?;
    Ok(RateLimitStatus::from_payload(page.object()?)?)
}
