// SPDX-License-Identifier: Apache-2.0

//! Page model and the fetch collaborator contract.
//!
//! Every remote call made by the engine goes through [`PageFetcher`]. The
//! engine never looks at transport details: it sees a [`Page`] of opaque JSON
//! items plus the pagination links the remote service advertised, or a
//! [`FetchError`].
//!
//! Pagination metadata parsing lives here so the search algorithms only ever
//! receive already-parsed page numbers.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Url;
use serde_json::Value;
use thiserror::Error;

/// Opaque record returned by a listing endpoint.
pub type Item = Value;

/// Quota category a remote call is billed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiCategory {
    /// Regular REST calls.
    Core,
    /// Search API calls, metered separately and far more scarce.
    Search,
    /// Quota status calls, exempt from metering.
    Status,
}

impl ApiCategory {
    /// Returns the lowercase name used in logs and status payloads.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiCategory::Core => "core",
            ApiCategory::Search => "search",
            ApiCategory::Status => "status",
        }
    }
}

impl fmt::Display for ApiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure signals a [`PageFetcher`] can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// No budget left for the category; the call was not made.
    #[error("{0} quota exhausted")]
    QuotaExceeded(ApiCategory),

    /// Credentials were missing or rejected.
    #[error("request was not authorized")]
    Unauthorized,

    /// The remote resource does not exist.
    #[error("resource not found: {url}")]
    NotFound {
        /// URL that returned not-found.
        url: String,
    },

    /// The server throttled the request (HTTP 429).
    #[error("rate limited by the server")]
    RateLimited {
        /// Server-provided retry interval in seconds, if any.
        retry_after: Option<u64>,
    },

    /// Temporary failure; the same request may succeed after a delay.
    #[error("transient failure: {message}")]
    Transient {
        /// Description of the failure.
        message: String,
        /// Server-provided retry interval in seconds, if any.
        retry_after: Option<u64>,
    },

    /// The payload did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Returns true if retrying the same request later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Transient { .. } | FetchError::RateLimited { .. }
        )
    }

    /// Returns the server-provided retry interval, if any.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            FetchError::Transient {
                retry_after: Some(secs),
                ..
            }
            | FetchError::RateLimited {
                retry_after: Some(secs),
            } if *secs > 0 => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }

    pub(crate) fn missing_field(field: &str) -> Self {
        FetchError::Malformed(format!("missing or invalid field `{field}`"))
    }
}

/// Pagination relations advertised by the remote service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLinks {
    /// URL of the next page.
    pub next: Option<String>,
    /// URL of the final page.
    pub last: Option<String>,
}

/// One fetched chunk of a paginated listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Items in server-supplied order.
    pub items: Vec<Item>,
    /// URL of the next page, present iff a `next` relation was advertised.
    pub next_url: Option<String>,
    /// URL of the final page, present only when more than one page exists.
    pub last_url: Option<String>,
    /// Total result count, when the endpoint reports one (search APIs).
    pub total_count: Option<u64>,
}

impl Page {
    /// Creates a page with no pagination links.
    #[must_use]
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    /// Attaches pagination links.
    #[must_use]
    pub fn with_links(mut self, links: PageLinks) -> Self {
        self.next_url = links.next;
        self.last_url = links.last;
        self
    }

    /// Builds a page from a decoded JSON body.
    ///
    /// - A JSON array becomes the item list.
    /// - An object carrying an `items` array (search responses) yields those
    ///   items and its `total_count`.
    /// - Any other object becomes a single-item page.
    pub fn from_json(body: Value, links: PageLinks) -> Result<Self, FetchError> {
        let page = match body {
            Value::Array(items) => Page::new(items),
            Value::Object(mut map) => match map.remove("items") {
                Some(Value::Array(items)) => Page {
                    total_count: map.get("total_count").and_then(Value::as_u64),
                    ..Page::new(items)
                },
                Some(other) => {
                    map.insert("items".to_string(), other);
                    Page::new(vec![Value::Object(map)])
                }
                None => Page::new(vec![Value::Object(map)]),
            },
            Value::Null => Page::default(),
            other => {
                return Err(FetchError::Malformed(format!(
                    "expected a JSON array or object, got {other}"
                )));
            }
        };
        Ok(page.with_links(links))
    }

    /// Returns true if a next page was advertised.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.next_url.is_some()
    }

    /// Total number of pages in the listing.
    ///
    /// A page without a `last` relation is the only page. A `last` URL whose
    /// page number cannot be parsed is malformed.
    pub fn page_count(&self) -> Result<u32, FetchError> {
        match &self.last_url {
            None => Ok(1),
            Some(url) => last_page_number(url).ok_or_else(|| {
                FetchError::Malformed(format!("cannot read page number from `{url}`"))
            }),
        }
    }

    /// Returns the single object of a non-listing response.
    pub fn object(&self) -> Result<&Item, FetchError> {
        self.items
            .first()
            .ok_or_else(|| FetchError::Malformed("empty response body".to_string()))
    }
}

/// Parses an RFC 8288 `Link` header into the relations the engine uses.
///
/// Unknown relations and unparseable entries are ignored.
#[must_use]
pub fn parse_link_header(header: &str) -> PageLinks {
    let mut links = PageLinks::default();

    for entry in header.split(',') {
        let mut parts = entry.split(';');
        let Some(target) = parts.next() else {
            continue;
        };
        let target = target.trim();
        let Some(url) = target
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
        else {
            continue;
        };

        for param in parts {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            if key.trim() != "rel" {
                continue;
            }
            for rel in value.trim().trim_matches('"').split_whitespace() {
                match rel {
                    "next" => links.next = Some(url.to_string()),
                    "last" => links.last = Some(url.to_string()),
                    _ => {}
                }
            }
        }
    }

    links
}

/// Extracts the page number encoded in a pagination URL.
///
/// Reads the `page` query parameter; URLs that do not parse as absolute URLs
/// fall back to the trailing `=N` of the query string.
#[must_use]
pub fn last_page_number(url: &str) -> Option<u32> {
    if let Ok(parsed) = Url::parse(url) {
        return parsed
            .query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse().ok());
    }

    url.rsplit_once('=')
        .and_then(|(_, number)| number.parse().ok())
}

/// Characters left unescaped in path segments and query values.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encodes a user-supplied URL component such as a tag, package
/// name, or language.
#[must_use]
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, UNRESERVED).to_string()
}

/// Reads an unsigned integer field from an item.
pub fn field_u64(item: &Item, field: &str) -> Result<u64, FetchError> {
    item.get(field)
        .and_then(Value::as_u64)
        .ok_or_else(|| FetchError::missing_field(field))
}

/// Reads a string field from an item.
pub fn field_str<'a>(item: &'a Item, field: &str) -> Result<&'a str, FetchError> {
    item.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| FetchError::missing_field(field))
}

/// Fetches one page from a remote service.
///
/// Implementations own transport concerns: authentication, decoding, and
/// retrying transient failures. The engine calls `fetch` strictly
/// sequentially.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url`, billed against `category`.
    async fn fetch(&self, url: &str, category: ApiCategory) -> Result<Page, FetchError>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const GITHUB_LINK: &str = "<https://api.github.com/repositories/1300192/issues?page=2>; rel=\"next\", \
         <https://api.github.com/repositories/1300192/issues?page=515>; rel=\"last\"";

    #[test]
    fn test_parse_link_header_next_and_last() {
        let links = parse_link_header(GITHUB_LINK);
        assert_eq!(
            links.next.as_deref(),
            Some("https://api.github.com/repositories/1300192/issues?page=2")
        );
        assert_eq!(
            links.last.as_deref(),
            Some("https://api.github.com/repositories/1300192/issues?page=515")
        );
    }

    #[test]
    fn test_parse_link_header_only_prev_and_first() {
        let header = "<https://x.test/a?page=1>; rel=\"prev\", <https://x.test/a?page=1>; rel=\"first\"";
        assert_eq!(parse_link_header(header), PageLinks::default());
    }

    #[test]
    fn test_parse_link_header_garbage() {
        assert_eq!(parse_link_header("not a link"), PageLinks::default());
        assert_eq!(parse_link_header(""), PageLinks::default());
    }

    #[test]
    fn test_last_page_number_reads_page_parameter() {
        let url = "https://api.github.com/search/repositories?q=stars:>0&per_page=100&page=10";
        assert_eq!(last_page_number(url), Some(10));
    }

    #[test]
    fn test_last_page_number_page_not_trailing() {
        let url = "https://api.github.com/repos/o/r/contributors?page=7&per_page=100&anon=1";
        assert_eq!(last_page_number(url), Some(7));
    }

    #[test]
    fn test_last_page_number_relative_fallback() {
        assert_eq!(last_page_number("/items?page=4"), Some(4));
        assert_eq!(last_page_number("/items?page=four"), None);
    }

    #[test]
    fn test_last_page_number_missing() {
        assert_eq!(last_page_number("https://x.test/items?per_page=100"), None);
    }

    #[test]
    fn test_page_from_json_array() {
        let page = Page::from_json(json!([{"a": 1}, {"a": 2}]), PageLinks::default()).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_count, None);
    }

    #[test]
    fn test_page_from_json_search_object() {
        let body = json!({"total_count": 42, "incomplete_results": false, "items": [{"id": 1}]});
        let page = Page::from_json(body, PageLinks::default()).unwrap();
        assert_eq!(page.items, vec![json!({"id": 1})]);
        assert_eq!(page.total_count, Some(42));
    }

    #[test]
    fn test_page_from_json_plain_object() {
        let body = json!({"full_name": "o/r", "stargazers_count": 3});
        let page = Page::from_json(body.clone(), PageLinks::default()).unwrap();
        assert_eq!(page.object().unwrap(), &body);
    }

    #[test]
    fn test_page_from_json_scalar_is_malformed() {
        let err = Page::from_json(json!(17), PageLinks::default()).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn test_page_count() {
        let single = Page::new(vec![]);
        assert_eq!(single.page_count().unwrap(), 1);

        let multi = Page::new(vec![]).with_links(parse_link_header(GITHUB_LINK));
        assert_eq!(multi.page_count().unwrap(), 515);

        let broken = Page {
            last_url: Some("https://x.test/items?page=last".to_string()),
            ..Page::default()
        };
        assert!(matches!(
            broken.page_count(),
            Err(FetchError::Malformed(_))
        ));
    }

    #[test]
    fn test_retry_after_only_for_transient() {
        let err = FetchError::Transient {
            message: "429".to_string(),
            retry_after: Some(5),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));
        assert!(err.is_transient());

        let zero = FetchError::Transient {
            message: "429".to_string(),
            retry_after: Some(0),
        };
        assert_eq!(zero.retry_after(), None);

        let throttled = FetchError::RateLimited {
            retry_after: Some(9),
        };
        assert!(throttled.is_transient());
        assert_eq!(throttled.retry_after(), Some(Duration::from_secs(9)));
        assert_eq!(FetchError::Unauthorized.retry_after(), None);
        assert!(!FetchError::Unauthorized.is_transient());
    }

    #[test]
    fn test_encode_component() {
        assert_eq!(encode_component("v1.0.0-rc_1~2"), "v1.0.0-rc_1~2");
        assert_eq!(encode_component("C++"), "C%2B%2B");
        assert_eq!(encode_component("Jupyter Notebook"), "Jupyter%20Notebook");
        assert_eq!(encode_component("release/1"), "release%2F1");
    }

    #[test]
    fn test_field_accessors() {
        let item = json!({"comments": 0, "tag_name": "v1.0.0"});
        assert_eq!(field_u64(&item, "comments").unwrap(), 0);
        assert_eq!(field_str(&item, "tag_name").unwrap(), "v1.0.0");
        assert!(field_u64(&item, "tag_name").is_err());
        assert!(field_str(&item, "missing").is_err());
    }
}
