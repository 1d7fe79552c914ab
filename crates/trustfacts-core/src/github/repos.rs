// SPDX-License-Identifier: Apache-2.0

//! Repository-level GitHub metrics.

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, instrument};

use super::GitHubSession;
use crate::fetch::{ApiCategory, Item, encode_component, field_u64};
use crate::pagination::{PageSource, count_items, walk_pages};
use crate::rank::{RankTarget, find_rank};

/// Fetches the repository object.
#[instrument(skip(session))]
pub async fn repository(session: &mut GitHubSession, owner: &str, repo: &str) -> Result<Item> {
    let url = session.repo_url(owner, repo, "");
    let page = session
        .fetch(&url, ApiCategory::Core)
        .await
        .with_context(|| format!("Failed to fetch repository {owner}/{repo}"))?;
    Ok(page.object()?.clone())
}

/// Primary language of the repository, `None` when GitHub detected none.
pub async fn language(
    session: &mut GitHubSession,
    owner: &str,
    repo: &str,
) -> Result<Option<String>> {
    let repository = repository(session, owner, repo).await?;
    Ok(repository
        .get("language")
        .and_then(Value::as_str)
        .map(str::to_string))
}

/// Number of users who starred the repository.
pub async fn stargazer_count(
    session: &mut GitHubSession,
    owner: &str,
    repo: &str,
) -> Result<u64> {
    let repository = repository(session, owner, repo).await?;
    Ok(field_u64(&repository, "stargazers_count")?)
}

/// Number of contributors, anonymous ones included.
///
/// Costs at most two calls regardless of the contributor count.
#[instrument(skip(session))]
pub async fn contributor_count(
    session: &mut GitHubSession,
    owner: &str,
    repo: &str,
) -> Result<u64> {
    let base = session.repo_url(
        owner,
        repo,
        &format!("/contributors?per_page={}&anon=1", session.page_size()),
    );
    let mut pages = session.pages(ApiCategory::Core, |n| format!("{base}&page={n}"));

    let first = pages
        .page(1)
        .await
        .context("Failed to fetch contributors")?;
    let total = count_items(&first, &mut pages)
        .await
        .context("Failed to count contributors")?;
    debug!(total, "Counted contributors");
    Ok(total)
}

/// Number of commits over the last 52 weeks.
#[instrument(skip(session))]
pub async fn yearly_commit_count(
    session: &mut GitHubSession,
    owner: &str,
    repo: &str,
) -> Result<u64> {
    let url = session.repo_url(owner, repo, "/stats/commit_activity");
    let page = session
        .fetch(&url, ApiCategory::Core)
        .await
        .context("Failed to fetch commit activity")?;

    let mut total = 0;
    for week in &page.items {
        total += field_u64(week, "total")?;
    }
    Ok(total)
}

/// Total stars over every repository of an organization.
///
/// Walks all repository pages of the organization, so the cost grows with
/// its size.
#[instrument(skip(session))]
pub async fn owner_stargazer_count(session: &mut GitHubSession, owner: &str) -> Result<u64> {
    let base = session.api_url(&format!(
        "/orgs/{owner}/repos?per_page={}",
        session.page_size()
    ));
    let mut pages = session.pages(ApiCategory::Core, |n| format!("{base}&page={n}"));

    let mut total = 0;
    walk_pages(&mut pages, |page| {
        for repository in &page.items {
            total += field_u64(repository, "stargazers_count")?;
        }
        Ok(())
    })
    .await
    .with_context(|| format!("Failed to sum stargazers of {owner}"))?;
    Ok(total)
}

/// 0-based position of the repository among all repositories of its
/// language, ranked by stars.
///
/// Returns `None` when the repository has no language or falls outside the
/// range the search API indexes.
#[instrument(skip(session))]
pub async fn gitstar_ranking(
    session: &mut GitHubSession,
    owner: &str,
    repo: &str,
) -> Result<Option<u64>> {
    let repository = repository(session, owner, repo).await?;
    let Some(language) = repository.get("language").and_then(Value::as_str) else {
        debug!("Repository has no language, cannot rank");
        return Ok(None);
    };
    let identity = repository
        .get("full_name")
        .and_then(Value::as_str)
        .map_or_else(|| format!("{owner}/{repo}"), str::to_string);
    let stars = field_u64(&repository, "stargazers_count")?;

    let base = session.api_url(&format!(
        "/search/repositories?q=stars:>0+language:{}&sort=stars&order=desc&per_page={}",
        encode_component(language),
        session.page_size()
    ));
    let mut pages = session.pages(ApiCategory::Search, |n| format!("{base}&page={n}"));

    let target = RankTarget {
        identity: &identity,
        key: stars,
        identity_field: "full_name",
        key_field: "stargazers_count",
    };
    let rank = find_rank(&mut pages, &target)
        .await
        .context("Failed to rank repository")?;
    Ok(rank)
}
