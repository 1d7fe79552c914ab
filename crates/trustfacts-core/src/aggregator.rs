// SPDX-License-Identifier: Apache-2.0

//! Metric request dispatch.
//!
//! An [`Aggregator`] takes a [`MetricRequest`], evaluates each requested
//! metric one after another, and returns a JSON object holding every
//! requested key. Metrics that are unknown or cannot be computed are `null`;
//! a single failing metric never fails the request.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info, instrument, warn};

use crate::collaborators::Collaborators;
use crate::error::TrustError;
use crate::fetch::{FetchError, PageFetcher};
use crate::github::releases::release_version;
use crate::github::{GitHubSession, issues, releases, repos};
use crate::libraries::LibrariesClient;
use crate::stackoverflow;

/// The package a request is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Package registry, e.g. `npm` or `pypi`.
    pub project_platform: String,
    /// Owner of the source repository.
    pub project_owner: String,
    /// Repository and package name.
    pub project_name: String,
    /// Release tag, e.g. `v1.2.3`.
    pub project_release: String,
}

/// Metrics requested for one package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricRequest {
    /// The package. Required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_info: Option<ProjectInfo>,
    /// GitHub metric names.
    #[serde(default)]
    pub gh_data_points: Vec<String>,
    /// Libraries.io metric names.
    #[serde(default)]
    pub lib_data_points: Vec<String>,
    /// Vulnerability metric names.
    #[serde(default)]
    pub cve_data_points: Vec<String>,
    /// Stack Overflow metric names.
    #[serde(default)]
    pub so_data_points: Vec<String>,
    /// Present to request a virus scan of the release assets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virus_scanning: Option<Vec<String>>,
}

impl MetricRequest {
    /// Parses a request document.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::InvalidRequest`] when the document is not valid
    /// JSON or `project_info` lacks one of its fields.
    pub fn from_json(document: &str) -> Result<Self, TrustError> {
        serde_json::from_str(document)
            .map_err(|e| TrustError::invalid_request(format!("cannot parse request: {e}")))
    }

    /// The package, required for every metric.
    pub fn project(&self) -> Result<&ProjectInfo, TrustError> {
        self.project_info
            .as_ref()
            .ok_or_else(|| TrustError::invalid_request("missing `project_info`"))
    }
}

/// Declares a metric enum whose variants map one-to-one onto wire names.
macro_rules! metric_names {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal,)+ }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $(
                #[doc = concat!("`", $wire, "`")]
                $variant,
            )+
        }

        impl $name {
            /// Every metric of this source.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire name of the metric.
            #[must_use]
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownMetric;

            fn from_str(name: &str) -> Result<Self, Self::Err> {
                match name {
                    $($wire => Ok($name::$variant),)+
                    _ => Err(UnknownMetric(name.to_string())),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// A metric name no source recognizes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown metric `{0}`")]
pub struct UnknownMetric(pub String);

metric_names!(
    /// Metrics computed from GitHub.
    GitHubMetric {
        ContributorCount => "gh_contributor_count",
        UserCount => "gh_user_count",
        TotalDownloadCount => "gh_total_download_count",
        ReleaseDownloadCount => "gh_release_download_count",
        YearlyCommitCount => "gh_yearly_commit_count",
        RepositoryLanguage => "gh_repository_language",
        StargazerCount => "gh_stargazer_count",
        GitstarRanking => "gh_gitstar_ranking",
        OpenIssuesCount => "gh_open_issues_count",
        ZeroResponseIssuesCount => "gh_zero_response_issues_count",
        ReleaseIssuesCount => "gh_release_issues_count",
        IssueRatio => "gh_issue_ratio",
        AverageResolutionTime => "gh_average_resolution_time",
        OwnerStargazerCount => "gh_owner_stargazer_count",
    }
);

metric_names!(
    /// Metrics computed from Libraries.io.
    LibrariesMetric {
        ReleaseFrequency => "lib_release_frequency",
        ContributorCount => "lib_contributor_count",
        DependencyCount => "lib_dependency_count",
        DependentCount => "lib_dependent_count",
        LatestReleaseDate => "lib_latest_release_date",
        FirstReleaseDate => "lib_first_release_date",
        ReleaseCount => "lib_release_count",
        Sourcerank => "lib_sourcerank",
    }
);

metric_names!(
    /// Metrics served by the vulnerability collaborator.
    CveMetric {
        Count => "cve_count",
        Vulnerabilities => "cve_vulnerabilities",
        Codes => "cve_codes",
    }
);

metric_names!(
    /// Metrics computed from the Stack Overflow trends feed.
    StackOverflowMetric {
        Popularity => "so_popularity",
    }
);

/// Evaluates metric requests against the configured sources.
pub struct Aggregator {
    github: GitHubSession,
    libraries: LibrariesClient,
    trends: Arc<dyn PageFetcher>,
    trends_url: String,
    collaborators: Collaborators,
}

impl Aggregator {
    /// Creates an aggregator without collaborators.
    #[must_use]
    pub fn new(
        github: GitHubSession,
        libraries: LibrariesClient,
        trends: Arc<dyn PageFetcher>,
        trends_url: impl Into<String>,
    ) -> Self {
        Self {
            github,
            libraries,
            trends,
            trends_url: trends_url.into(),
            collaborators: Collaborators::default(),
        }
    }

    /// Sets the collaborators used for scraped, vulnerability, and scan
    /// metrics.
    #[must_use]
    pub fn with_collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = collaborators;
        self
    }

    /// The GitHub session, for inspecting the remaining quota.
    #[must_use]
    pub fn github(&self) -> &GitHubSession {
        &self.github
    }

    /// Evaluates every metric named in `request`.
    ///
    /// # Errors
    ///
    /// Fails only when the request has no `project_info`.
    #[instrument(skip_all)]
    pub async fn run(
        &mut self,
        request: &MetricRequest,
    ) -> Result<Map<String, Value>, TrustError> {
        let project = request.project()?;
        let mut output = Map::new();

        for name in &request.gh_data_points {
            let value = match name.parse::<GitHubMetric>() {
                Ok(metric) => self.github_metric(metric, project).await,
                Err(e) => unknown(&e),
            };
            output.insert(name.clone(), value);
        }

        let lib_release = release_version(&project.project_release);
        for name in &request.lib_data_points {
            let value = match name.parse::<LibrariesMetric>() {
                Ok(metric) => self.libraries_metric(metric, project, lib_release).await,
                Err(e) => unknown(&e),
            };
            output.insert(name.clone(), value);
        }

        for name in &request.cve_data_points {
            let value = match name.parse::<CveMetric>() {
                Ok(metric) => self.cve_metric(metric, &project.project_name).await,
                Err(e) => unknown(&e),
            };
            output.insert(name.clone(), value);
        }

        for name in &request.so_data_points {
            let value = match name.parse::<StackOverflowMetric>() {
                Ok(StackOverflowMetric::Popularity) => {
                    let result = stackoverflow::popularity(
                        self.trends.as_ref(),
                        &self.trends_url,
                        &project.project_name,
                    )
                    .await;
                    settle(StackOverflowMetric::Popularity.as_str(), result)
                }
                Err(e) => unknown(&e),
            };
            output.insert(name.clone(), value);
        }

        if request.virus_scanning.is_some() {
            info!("Scanning release assets for viruses");
            let ratio = self.virus_ratio(project).await;
            output.insert("virus_scanning".to_string(), json!({ "virus_ratio": ratio }));
        }

        let quota = self.github.quota();
        debug!(
            metrics = output.len(),
            core_remaining = quota.core_remaining,
            search_remaining = quota.search_remaining,
            "Aggregation finished"
        );
        Ok(output)
    }

    async fn github_metric(&mut self, metric: GitHubMetric, project: &ProjectInfo) -> Value {
        let owner = project.project_owner.as_str();
        let repo = project.project_name.as_str();
        let release = project.project_release.as_str();
        let session = &mut self.github;
        let name = metric.as_str();

        match metric {
            GitHubMetric::ContributorCount => {
                settle(name, repos::contributor_count(session, owner, repo).await)
            }
            GitHubMetric::TotalDownloadCount => settle(
                name,
                releases::total_download_count(session, owner, repo).await,
            ),
            GitHubMetric::ReleaseDownloadCount => settle(
                name,
                releases::release_download_count(session, owner, repo, release).await,
            ),
            GitHubMetric::YearlyCommitCount => {
                settle(name, repos::yearly_commit_count(session, owner, repo).await)
            }
            GitHubMetric::RepositoryLanguage => {
                settle(name, repos::language(session, owner, repo).await)
            }
            GitHubMetric::StargazerCount => {
                settle(name, repos::stargazer_count(session, owner, repo).await)
            }
            GitHubMetric::GitstarRanking => {
                settle(name, repos::gitstar_ranking(session, owner, repo).await)
            }
            GitHubMetric::ZeroResponseIssuesCount => settle(
                name,
                issues::zero_response_issue_count(session, owner, repo).await,
            ),
            GitHubMetric::ReleaseIssuesCount => settle(
                name,
                issues::release_issue_count(session, owner, repo, release).await,
            ),
            GitHubMetric::AverageResolutionTime => settle(
                name,
                issues::average_resolution_time(session, owner, repo).await,
            ),
            GitHubMetric::OwnerStargazerCount => {
                settle(name, repos::owner_stargazer_count(session, owner).await)
            }
            GitHubMetric::UserCount | GitHubMetric::OpenIssuesCount | GitHubMetric::IssueRatio => {
                let Some(spider) = self.collaborators.spider.clone() else {
                    return missing_collaborator(name, "repository spider");
                };
                match metric {
                    GitHubMetric::UserCount => settle(name, spider.user_count(owner, repo).await),
                    GitHubMetric::OpenIssuesCount => {
                        settle(name, spider.open_issue_count(owner, repo).await)
                    }
                    _ => settle(name, spider.issue_ratio(owner, repo).await),
                }
            }
        }
    }

    async fn libraries_metric(
        &mut self,
        metric: LibrariesMetric,
        project: &ProjectInfo,
        release: &str,
    ) -> Value {
        let platform = project.project_platform.as_str();
        let owner = project.project_owner.as_str();
        let name = project.project_name.as_str();
        let client = &mut self.libraries;
        let metric_name = metric.as_str();

        match metric {
            LibrariesMetric::ReleaseFrequency => {
                settle(metric_name, client.release_frequency(platform, name).await)
            }
            LibrariesMetric::ContributorCount => {
                settle(metric_name, client.contributor_count(owner, name).await)
            }
            LibrariesMetric::DependencyCount => settle(
                metric_name,
                client.dependency_count(platform, name, release).await,
            ),
            LibrariesMetric::DependentCount => {
                settle(metric_name, client.dependent_count(platform, name).await)
            }
            LibrariesMetric::LatestReleaseDate => {
                settle(metric_name, client.latest_release_date(platform, name).await)
            }
            LibrariesMetric::FirstReleaseDate => {
                settle(metric_name, client.first_release_date(platform, name).await)
            }
            LibrariesMetric::ReleaseCount => {
                settle(metric_name, client.release_count(platform, name).await)
            }
            LibrariesMetric::Sourcerank => {
                settle(metric_name, client.sourcerank(platform, name).await)
            }
        }
    }

    async fn cve_metric(&self, metric: CveMetric, package: &str) -> Value {
        let name = metric.as_str();
        let Some(source) = self.collaborators.vulnerabilities.as_ref() else {
            return missing_collaborator(name, "vulnerability source");
        };

        match metric {
            CveMetric::Count => settle(name, source.cve_count(package).await),
            CveMetric::Vulnerabilities => settle(name, source.vulnerabilities(package).await),
            CveMetric::Codes => settle(name, source.cve_codes(package).await),
        }
    }

    async fn virus_ratio(&mut self, project: &ProjectInfo) -> Value {
        const NAME: &str = "virus_ratio";
        let Some(scanner) = self.collaborators.scanner.clone() else {
            return missing_collaborator(NAME, "virus scanner");
        };

        let links = releases::release_download_links(
            &mut self.github,
            &project.project_owner,
            &project.project_name,
            &project.project_release,
        )
        .await;
        match links {
            Ok(links) => settle(NAME, scanner.virus_ratio(&links).await),
            Err(e) => settle::<f64>(NAME, Err(e)),
        }
    }
}

fn unknown(error: &UnknownMetric) -> Value {
    warn!(%error, "Skipping metric");
    Value::Null
}

fn missing_collaborator(metric: &str, collaborator: &str) -> Value {
    warn!(metric, collaborator, "No collaborator configured, metric unavailable");
    Value::Null
}

/// Turns a metric result into its output value, logging failures.
fn settle<T: Serialize>(metric: &str, result: anyhow::Result<T>) -> Value {
    let error = match result {
        Ok(value) => match serde_json::to_value(value) {
            Ok(value) => return value,
            Err(e) => anyhow!(e),
        },
        Err(e) => e,
    };

    let quota_exhausted = error
        .chain()
        .any(|cause| {
            matches!(
                cause.downcast_ref::<FetchError>(),
                Some(FetchError::QuotaExceeded(_))
            )
        });
    if quota_exhausted {
        warn!(metric, "Quota exhausted, metric unavailable");
    } else {
        warn!(metric, error = format!("{error:#}"), "Metric unavailable");
    }
    Value::Null
}
