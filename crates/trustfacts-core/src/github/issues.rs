// SPDX-License-Identifier: Apache-2.0

//! Issue-related GitHub metrics.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, instrument};

use super::GitHubSession;
use super::releases::release_window;
use crate::boundary::{count_prefix, zero_comments};
use crate::fetch::{ApiCategory, FetchError, Item, field_str};
use crate::pagination::PageSource;

/// Closed issues considered for the average resolution time.
const RESOLUTION_SAMPLE: usize = 200;

/// Number of open issues that never received a comment.
#[instrument(skip(session))]
pub async fn zero_response_issue_count(
    session: &mut GitHubSession,
    owner: &str,
    repo: &str,
) -> Result<u64> {
    let base = session.repo_url(
        owner,
        repo,
        &format!(
            "/issues?per_page={}&state=open&sort=comments&direction=asc",
            session.page_size()
        ),
    );
    let mut pages = session.pages(ApiCategory::Core, |n| format!("{base}&page={n}"));

    count_prefix(&mut pages, zero_comments)
        .await
        .context("Failed to count zero-response issues")
}

/// Mean seconds between creation and closing over the most recently
/// created closed issues (at most 200).
///
/// Returns `None` when the repository has no closed issues.
#[instrument(skip(session))]
pub async fn average_resolution_time(
    session: &mut GitHubSession,
    owner: &str,
    repo: &str,
) -> Result<Option<f64>> {
    let base = session.repo_url(
        owner,
        repo,
        &format!(
            "/issues?per_page={}&state=closed&sort=created&direction=desc",
            session.page_size()
        ),
    );
    let mut pages = session.pages(ApiCategory::Core, |n| format!("{base}&page={n}"));

    let mut issues: Vec<Item> = Vec::new();
    let mut number = 1;
    while issues.len() < RESOLUTION_SAMPLE {
        let page = pages
            .page(number)
            .await
            .context("Failed to fetch closed issues")?;
        let has_next = page.has_next();
        issues.extend(page.items);
        if !has_next {
            break;
        }
        number += 1;
    }
    issues.truncate(RESOLUTION_SAMPLE);

    if issues.is_empty() {
        return Ok(None);
    }

    let mut total_seconds: i64 = 0;
    for issue in &issues {
        let created = timestamp(issue, "created_at")?;
        let closed = timestamp(issue, "closed_at")?;
        total_seconds += (closed - created).num_seconds();
    }

    #[allow(clippy::cast_precision_loss)]
    let average = total_seconds as f64 / issues.len() as f64;
    debug!(sample = issues.len(), average, "Computed resolution time");
    Ok(Some(average))
}

/// Number of issues opened between a release and its successor.
///
/// The window is open-ended for the newest release. Returns `None` when the
/// release does not exist.
#[instrument(skip(session))]
pub async fn release_issue_count(
    session: &mut GitHubSession,
    owner: &str,
    repo: &str,
    release: &str,
) -> Result<Option<u64>> {
    let window = release_window(session, owner, repo, release).await?;
    let (Some(from), to) = window.dates() else {
        debug!("Release not found");
        return Ok(None);
    };

    let range = format!(
        "{}..{}",
        search_date(from),
        to.map_or_else(|| "*".to_string(), search_date)
    );
    let url = session.api_url(&format!(
        "/search/issues?q=is:issue+created:{range}+repo:{owner}/{repo}&per_page={}",
        session.page_size()
    ));
    let page = session
        .fetch(&url, ApiCategory::Search)
        .await
        .context("Failed to search release issues")?;

    let count = page
        .total_count
        .ok_or_else(|| FetchError::missing_field("total_count"))?;
    Ok(Some(count))
}

fn search_date(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn timestamp(issue: &Item, field: &str) -> Result<DateTime<Utc>, FetchError> {
    let raw = field_str(issue, field)?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| FetchError::missing_field(field))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{Value, json};

    use super::super::test_support::{API, session};
    use super::*;
    use crate::testing::FakeFetcher;

    fn closed_issue(hours: i64) -> Value {
        json!({
            "created_at": "2024-01-01T00:00:00Z",
            "closed_at": format!("2024-01-{:02}T{:02}:00:00Z", 1 + hours / 24, hours % 24),
        })
    }

    #[tokio::test]
    async fn test_zero_response_issue_count() {
        let fetcher = Arc::new(FakeFetcher::new());
        let base = format!("{API}/repos/o/r/issues?per_page=3&state=open&sort=comments&direction=asc");
        let issues: Vec<Value> = [0, 0, 0, 0, 1, 2, 5]
            .iter()
            .map(|c| json!({ "comments": c }))
            .collect();
        fetcher.respond_listing(&base, &issues, 3);
        let mut session = session(&fetcher, 3);

        assert_eq!(
            zero_response_issue_count(&mut session, "o", "r").await.unwrap(),
            4
        );
        assert_eq!(fetcher.call_count(), 2);
    }

    #[tokio::test]
    async fn test_average_resolution_time_spans_days() {
        let fetcher = Arc::new(FakeFetcher::new());
        let base = format!("{API}/repos/o/r/issues?per_page=100&state=closed&sort=created&direction=desc");
        fetcher.respond_listing(&base, &[closed_issue(48), closed_issue(24)], 100);
        let mut session = session(&fetcher, 100);

        let average = average_resolution_time(&mut session, "o", "r")
            .await
            .unwrap()
            .unwrap();

        assert!((average - 36.0 * 3600.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_average_resolution_time_caps_sample() {
        let fetcher = Arc::new(FakeFetcher::new());
        let base = format!("{API}/repos/o/r/issues?per_page=100&state=closed&sort=created&direction=desc");
        let mut issues: Vec<Value> = (0..200).map(|_| closed_issue(1)).collect();
        issues.extend((0..50).map(|_| closed_issue(100)));
        fetcher.respond_listing(&base, &issues, 100);
        let mut session = session(&fetcher, 100);

        let average = average_resolution_time(&mut session, "o", "r")
            .await
            .unwrap()
            .unwrap();

        assert!((average - 3600.0).abs() < f64::EPSILON);
        assert_eq!(fetcher.call_count(), 2);
    }

    #[tokio::test]
    async fn test_average_resolution_time_no_issues() {
        let fetcher = Arc::new(FakeFetcher::new());
        let base = format!("{API}/repos/o/r/issues?per_page=100&state=closed&sort=created&direction=desc");
        fetcher.respond_listing(&base, &[], 100);
        let mut session = session(&fetcher, 100);

        assert_eq!(
            average_resolution_time(&mut session, "o", "r").await.unwrap(),
            None
        );
    }

    fn releases_listing(fetcher: &FakeFetcher) {
        let base = format!("{API}/repos/o/r/releases?per_page=100");
        let releases = vec![
            json!({ "tag_name": "v2.0.0", "published_at": "2024-03-01T10:00:00Z" }),
            json!({ "tag_name": "v1.0.0", "published_at": "2024-01-01T10:00:00Z" }),
        ];
        fetcher.respond_listing(&base, &releases, 100);
    }

    #[tokio::test]
    async fn test_release_issue_count_bounded_window() {
        let fetcher = Arc::new(FakeFetcher::new());
        releases_listing(&fetcher);
        fetcher.respond_json(
            &format!(
                "{API}/search/issues?q=is:issue+created:2024-01-01T10:00:00Z..2024-03-01T10:00:00Z+repo:o/r&per_page=100"
            ),
            json!({ "total_count": 17, "incomplete_results": false, "items": [] }),
        );
        let mut session = session(&fetcher, 100);

        assert_eq!(
            release_issue_count(&mut session, "o", "r", "v1.0.0")
                .await
                .unwrap(),
            Some(17)
        );
        assert_eq!(session.quota().search_remaining, 29);
    }

    #[tokio::test]
    async fn test_release_issue_count_open_ended_for_newest() {
        let fetcher = Arc::new(FakeFetcher::new());
        releases_listing(&fetcher);
        fetcher.respond_json(
            &format!(
                "{API}/search/issues?q=is:issue+created:2024-03-01T10:00:00Z..*+repo:o/r&per_page=100"
            ),
            json!({ "total_count": 3, "items": [] }),
        );
        let mut session = session(&fetcher, 100);

        assert_eq!(
            release_issue_count(&mut session, "o", "r", "v2.0.0")
                .await
                .unwrap(),
            Some(3)
        );
    }

    #[tokio::test]
    async fn test_release_issue_count_unknown_release() {
        let fetcher = Arc::new(FakeFetcher::new());
        releases_listing(&fetcher);
        let mut session = session(&fetcher, 100);

        assert_eq!(
            release_issue_count(&mut session, "o", "r", "v9.9.9")
                .await
                .unwrap(),
            None
        );
        assert_eq!(session.quota().search_remaining, 30);
    }
}
