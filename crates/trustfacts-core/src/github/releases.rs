// SPDX-License-Identifier: Apache-2.0

//! Release-related GitHub metrics.
//!
//! Provides download counts, asset links, and the publish window of a release.

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, instrument};

use super::GitHubSession;
use crate::fetch::{ApiCategory, FetchError, Item, encode_component, field_str, field_u64};
use crate::pagination::walk_pages;
use crate::release::{ReleaseWindow, resolve_window};

/// Strip a leading `v`/`V` from a release tag to get the package version.
///
/// # Arguments
///
/// * `tag` - The tag name to parse
///
/// # Returns
///
/// The version string, `v1.0.0` becoming `1.0.0`.
#[must_use]
pub fn release_version(tag: &str) -> &str {
    tag.strip_prefix(['v', 'V']).unwrap_or(tag)
}

/// Fetch the release carrying `tag`.
#[instrument(skip(session))]
pub async fn release_by_tag(
    session: &mut GitHubSession,
    owner: &str,
    repo: &str,
    tag: &str,
) -> Result<Item> {
    let path = format!("/releases/tags/{}", encode_component(tag));
    let url = session.repo_url(owner, repo, &path);
    let page = session
        .fetch(&url, ApiCategory::Core)
        .await
        .with_context(|| format!("Failed to fetch release {tag}"))?;
    Ok(page.object()?.clone())
}

/// Downloads of the assets of one release.
///
/// Only packaged assets count: those whose content type contains
/// `application`.
pub async fn release_download_count(
    session: &mut GitHubSession,
    owner: &str,
    repo: &str,
    tag: &str,
) -> Result<u64> {
    let release = release_by_tag(session, owner, repo, tag).await?;
    Ok(asset_downloads(&release)?)
}

/// Downloads of the packaged assets of every release.
#[instrument(skip(session))]
pub async fn total_download_count(
    session: &mut GitHubSession,
    owner: &str,
    repo: &str,
) -> Result<u64> {
    let base = session.repo_url(
        owner,
        repo,
        &format!("/releases?per_page={}", session.page_size()),
    );
    let mut pages = session.pages(ApiCategory::Core, |n| format!("{base}&page={n}"));

    let mut total = 0;
    let page_count = walk_pages(&mut pages, |page| {
        for release in &page.items {
            total += asset_downloads(release)?;
        }
        Ok(())
    })
    .await
    .context("Failed to walk releases")?;
    debug!(page_count, total, "Summed release downloads");
    Ok(total)
}

/// Browser download URLs of the assets of one release.
pub async fn release_download_links(
    session: &mut GitHubSession,
    owner: &str,
    repo: &str,
    tag: &str,
) -> Result<Vec<String>> {
    let release = release_by_tag(session, owner, repo, tag).await?;
    let links = assets(&release)?
        .iter()
        .map(|asset| field_str(asset, "browser_download_url").map(str::to_string))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(links)
}

/// Publish time of the release and of the release that followed it.
#[instrument(skip(session))]
pub async fn release_window(
    session: &mut GitHubSession,
    owner: &str,
    repo: &str,
    tag: &str,
) -> Result<ReleaseWindow> {
    let base = session.repo_url(
        owner,
        repo,
        &format!("/releases?per_page={}", session.page_size()),
    );
    let mut pages = session.pages(ApiCategory::Core, |n| format!("{base}&page={n}"));

    resolve_window(&mut pages, tag)
        .await
        .with_context(|| format!("Failed to resolve release window of {tag}"))
}

fn assets(release: &Item) -> Result<&Vec<Value>, FetchError> {
    release
        .get("assets")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::missing_field("assets"))
}

fn asset_downloads(release: &Item) -> Result<u64, FetchError> {
    let mut total = 0;
    for asset in assets(release)? {
        let packaged = asset
            .get("content_type")
            .and_then(Value::as_str)
            .is_some_and(|content_type| content_type.contains("application"));
        if packaged {
            total += field_u64(asset, "download_count")?;
        }
    }
    Ok(total)
}
