// SPDX-License-Identifier: Apache-2.0

//! Libraries.io package-registry metrics.
//!
//! Libraries.io calls bypass the GitHub quota: the client talks to its
//! fetcher directly. The project document is fetched once per
//! `(platform, name)` and reused by every metric derived from it.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::LibrariesConfig;
use crate::fetch::{
    ApiCategory, FetchError, Item, PageFetcher, encode_component, field_str, field_u64,
};
use crate::release::published_at;

/// Client for the Libraries.io project API.
pub struct LibrariesClient {
    fetcher: Arc<dyn PageFetcher>,
    api_base: String,
    projects: HashMap<(String, String), Item>,
}

impl LibrariesClient {
    /// Creates a client over `fetcher`.
    #[must_use]
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: &LibrariesConfig) -> Self {
        Self {
            fetcher,
            api_base: config.api_url.trim_end_matches('/').to_string(),
            projects: HashMap::new(),
        }
    }

    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.api_base.clone();
        for segment in segments {
            url.push('/');
            url.push_str(&encode_component(segment));
        }
        url
    }

    async fn get(&self, url: &str) -> Result<Item, FetchError> {
        let page = self.fetcher.fetch(url, ApiCategory::Core).await?;
        Ok(page.object()?.clone())
    }

    /// Fetches the project document, served from cache after the first call.
    #[instrument(skip(self))]
    pub async fn project(&mut self, platform: &str, name: &str) -> Result<&Item> {
        let key = (platform.to_string(), name.to_string());
        if !self.projects.contains_key(&key) {
            let url = self.url(&[platform, name]);
            let project = self
                .get(&url)
                .await
                .with_context(|| format!("Failed to fetch project {platform}/{name}"))?;
            debug!("Cached project document");
            self.projects.insert(key.clone(), project);
        }
        self.projects
            .get(&key)
            .ok_or_else(|| anyhow::anyhow!("project {platform}/{name} missing from cache"))
    }

    /// Number of dependents reported for the project.
    pub async fn dependent_count(&mut self, platform: &str, name: &str) -> Result<u64> {
        let project = self.project(platform, name).await?;
        Ok(field_u64(project, "dependents_count")?)
    }

    /// SourceRank score of the project.
    pub async fn sourcerank(&mut self, platform: &str, name: &str) -> Result<u64> {
        let project = self.project(platform, name).await?;
        Ok(field_u64(project, "rank")?)
    }

    /// Number of published versions.
    pub async fn release_count(&mut self, platform: &str, name: &str) -> Result<u64> {
        let project = self.project(platform, name).await?;
        Ok(versions(project)?.len() as u64)
    }

    /// Publish timestamp of the latest release, as reported by the registry.
    pub async fn latest_release_date(&mut self, platform: &str, name: &str) -> Result<String> {
        let project = self.project(platform, name).await?;
        Ok(field_str(project, "latest_release_published_at")?.to_string())
    }

    /// Publish timestamp of the earliest version, as reported by the registry.
    pub async fn first_release_date(&mut self, platform: &str, name: &str) -> Result<String> {
        let project = self.project(platform, name).await?;
        let (raw, _) = earliest_version(versions(project)?)?;
        Ok(raw.to_string())
    }

    /// Average seconds between releases over the project's lifetime.
    ///
    /// Computed as the time from the first to the latest release divided by
    /// the number of versions.
    #[instrument(skip(self))]
    pub async fn release_frequency(&mut self, platform: &str, name: &str) -> Result<f64> {
        let project = self.project(platform, name).await?;
        let versions = versions(project)?;
        if versions.is_empty() {
            anyhow::bail!("project {platform}/{name} has no versions");
        }

        let latest = timestamp(field_str(project, "latest_release_published_at")?)?;
        let (_, first) = earliest_version(versions)?;
        let lifetime = (latest - first).num_seconds();

        #[allow(clippy::cast_precision_loss)]
        let frequency = lifetime as f64 / versions.len() as f64;
        debug!(
            lifetime,
            releases = versions.len(),
            frequency,
            "Computed release frequency"
        );
        Ok(frequency)
    }

    /// Contributor count of the GitHub repository backing the project.
    #[instrument(skip(self))]
    pub async fn contributor_count(&mut self, owner: &str, name: &str) -> Result<u64> {
        let url = self.url(&["github", owner, name]);
        let repository = self
            .get(&url)
            .await
            .with_context(|| format!("Failed to fetch repository {owner}/{name}"))?;
        Ok(field_u64(&repository, "github_contributions_count")?)
    }

    /// Runtime dependencies of one version; development dependencies and
    /// entries without a `kind` are not counted.
    #[instrument(skip(self))]
    pub async fn dependency_count(
        &mut self,
        platform: &str,
        name: &str,
        version: &str,
    ) -> Result<u64> {
        let url = self.url(&[platform, name, version, "dependencies"]);
        let document = self
            .get(&url)
            .await
            .with_context(|| format!("Failed to fetch dependencies of {name} {version}"))?;
        let dependencies = document
            .get("dependencies")
            .and_then(Value::as_array)
            .ok_or_else(|| FetchError::missing_field("dependencies"))?;

        let count = dependencies
            .iter()
            .filter(|dependency| {
                dependency
                    .get("kind")
                    .and_then(Value::as_str)
                    .is_some_and(|kind| kind != "Development")
            })
            .count();
        Ok(count as u64)
    }
}

fn versions(project: &Item) -> Result<&Vec<Value>, FetchError> {
    project
        .get("versions")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::missing_field("versions"))
}

fn timestamp(raw: &str) -> Result<DateTime<Utc>, FetchError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| FetchError::Malformed(format!("invalid timestamp `{raw}`: {e}")))
}

fn earliest_version(versions: &[Value]) -> Result<(&str, DateTime<Utc>), FetchError> {
    let mut earliest: Option<(&str, DateTime<Utc>)> = None;
    for version in versions {
        let raw = field_str(version, "published_at")?;
        let at = published_at(version)?;
        if earliest.is_none_or(|(_, current)| at < current) {
            earliest = Some((raw, at));
        }
    }
    earliest.ok_or_else(|| FetchError::Malformed("project has no versions".to_string()))
}
