// SPDX-License-Identifier: Apache-2.0

//! reqwest-backed [`PageFetcher`].
//!
//! Makes exactly one HTTP attempt per call and maps the response onto the
//! fetch contract: decoded JSON items, `Link` pagination relations, or a
//! [`FetchError`]. Wrap it in a [`RetryingFetcher`](crate::retry::RetryingFetcher)
//! to retry transient failures.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, LINK, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::debug;

use crate::config::{GitHubConfig, LibrariesConfig};
use crate::error::TrustError;
use crate::fetch::{ApiCategory, FetchError, Page, PageFetcher, parse_link_header};
use crate::retry::is_retryable_http;

const USER_AGENT: &str = concat!("trustfacts/", env!("CARGO_PKG_VERSION"));

const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// How a fetcher authenticates its requests.
#[derive(Debug, Clone, Default)]
pub enum Credential {
    /// No credentials.
    #[default]
    Anonymous,
    /// `Authorization: Bearer <token>` header.
    Bearer(SecretString),
    /// Credential passed as a query parameter.
    QueryParam {
        /// Parameter name.
        name: &'static str,
        /// Parameter value.
        value: SecretString,
    },
}

/// Fetches pages over HTTP.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    http: Client,
    credential: Credential,
    accept: Option<&'static str>,
}

impl HttpPageFetcher {
    /// Creates a fetcher with the given credential and request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(credential: Credential, timeout: Duration) -> Result<Self, TrustError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            credential,
            accept: None,
        })
    }

    /// Creates a fetcher for the GitHub REST API.
    ///
    /// Without a token the API is used anonymously, with a much smaller quota.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn github(token: Option<SecretString>, config: &GitHubConfig) -> Result<Self, TrustError> {
        let credential = token.map_or(Credential::Anonymous, Credential::Bearer);
        let mut fetcher = Self::new(credential, Duration::from_secs(config.timeout_seconds))?;
        fetcher.accept = Some(GITHUB_ACCEPT);
        Ok(fetcher)
    }

    /// Creates a fetcher for the Libraries.io API, which takes its key as
    /// the `api_key` query parameter.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn libraries(
        token: Option<SecretString>,
        config: &LibrariesConfig,
    ) -> Result<Self, TrustError> {
        let credential = token.map_or(Credential::Anonymous, |value| Credential::QueryParam {
            name: "api_key",
            value,
        });
        Self::new(credential, Duration::from_secs(config.timeout_seconds))
    }

    /// Creates an unauthenticated fetcher.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn anonymous(timeout: Duration) -> Result<Self, TrustError> {
        Self::new(Credential::Anonymous, timeout)
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str, category: ApiCategory) -> Result<Page, FetchError> {
        let mut request = self.http.get(url);
        if let Some(accept) = self.accept {
            request = request.header(reqwest::header::ACCEPT, accept);
        }
        request = match &self.credential {
            Credential::Anonymous => request,
            Credential::Bearer(token) => request.bearer_auth(token.expose_secret()),
            Credential::QueryParam { name, value } => {
                request.query(&[(*name, value.expose_secret())])
            }
        };

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        debug!(url, %category, status = status.as_u16(), "Fetched");

        if status == StatusCode::ACCEPTED {
            // GitHub statistics endpoints answer 202 while computing
            return Err(FetchError::Transient {
                message: "statistics are being computed".to_string(),
                retry_after: None,
            });
        }

        if !status.is_success() {
            return Err(classify_status(status, response.headers(), url, category));
        }

        let links = response
            .headers()
            .get(LINK)
            .and_then(|h| h.to_str().ok())
            .map(parse_link_header)
            .unwrap_or_default();

        if status == StatusCode::NO_CONTENT {
            return Ok(Page::default().with_links(links));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| FetchError::Malformed(format!("invalid JSON from {url}: {e}")))?;
        Page::from_json(body, links)
    }
}

fn transport_error(e: reqwest::Error) -> FetchError {
    if e.is_builder() {
        return FetchError::Malformed(format!("invalid request: {e}"));
    }
    FetchError::Transient {
        message: e.to_string(),
        retry_after: None,
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

/// Maps a non-success HTTP status onto a [`FetchError`].
///
/// - 401: unauthorized
/// - 403 with `x-ratelimit-remaining: 0`: quota exhausted for `category`
/// - 403 with `Retry-After` (secondary rate limit): transient
/// - other 403: unauthorized
/// - 404: not found
/// - 429: rate limited, with the server's `Retry-After` if any
/// - 5xx: transient
pub(crate) fn classify_status(
    status: StatusCode,
    headers: &HeaderMap,
    url: &str,
    category: ApiCategory,
) -> FetchError {
    let retry_after = header_u64(headers, RETRY_AFTER.as_str());

    match status.as_u16() {
        401 => FetchError::Unauthorized,
        403 if header_u64(headers, "x-ratelimit-remaining") == Some(0) => {
            FetchError::QuotaExceeded(category)
        }
        403 if retry_after.is_some() => FetchError::Transient {
            message: "secondary rate limit (HTTP 403)".to_string(),
            retry_after,
        },
        403 => FetchError::Unauthorized,
        404 => FetchError::NotFound {
            url: url.to_string(),
        },
        429 => FetchError::RateLimited { retry_after },
        code if is_retryable_http(code) || status.is_server_error() => FetchError::Transient {
            message: format!("server error (HTTP {code})"),
            retry_after,
        },
        code => FetchError::Malformed(format!("unexpected status HTTP {code} from {url}")),
    }
}
