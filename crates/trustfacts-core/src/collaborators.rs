// SPDX-License-Identifier: Apache-2.0

//! Collaborators for metrics that are not served by a JSON API.
//!
//! Scraped repository statistics, vulnerability records, and antivirus
//! scanning are supplied by the embedding application. The aggregator
//! reports `null` for a metric whose collaborator is absent.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Repository statistics only available from the source host's web pages.
#[async_trait]
pub trait RepositorySpider: Send + Sync {
    /// Number of repositories that depend on this one.
    async fn user_count(&self, owner: &str, repo: &str) -> Result<u64>;

    /// Number of open issues.
    async fn open_issue_count(&self, owner: &str, repo: &str) -> Result<u64>;

    /// Open issues divided by closed issues.
    async fn issue_ratio(&self, owner: &str, repo: &str) -> Result<f64>;
}

/// One published vulnerability affecting a package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    /// CVE identifier, e.g. `CVE-2021-44228`.
    #[serde(rename = "CVE_ID")]
    pub id: String,
    /// CVSS v3 base score.
    #[serde(rename = "CVE_score")]
    pub score: Option<f64>,
    /// `including` or `excluding`, for the lower version bound.
    #[serde(rename = "CVE_affected_version_start_type")]
    pub affected_start_type: Option<String>,
    /// Lower bound of the affected version range.
    #[serde(rename = "CVE_affected_version_start")]
    pub affected_start: Option<String>,
    /// `including` or `excluding`, for the upper version bound.
    #[serde(rename = "CVE_affected_version_end_type")]
    pub affected_end_type: Option<String>,
    /// Upper bound of the affected version range.
    #[serde(rename = "CVE_affected_version_end")]
    pub affected_end: Option<String>,
}

/// Source of vulnerability records for a package.
#[async_trait]
pub trait VulnerabilitySource: Send + Sync {
    /// CVE identifiers recorded for `package`.
    async fn cve_codes(&self, package: &str) -> Result<Vec<String>>;

    /// Full records for every CVE recorded for `package`.
    async fn vulnerabilities(&self, package: &str) -> Result<Vec<Vulnerability>>;

    /// Number of CVEs recorded for `package`.
    async fn cve_count(&self, package: &str) -> Result<u64> {
        Ok(self.cve_codes(package).await?.len() as u64)
    }
}

/// Antivirus scanning of release artifacts.
#[async_trait]
pub trait VirusScanner: Send + Sync {
    /// Fraction of the files behind `links` found to be infected.
    async fn virus_ratio(&self, links: &[String]) -> Result<f64>;
}

/// The optional collaborators available to an aggregation.
#[derive(Clone, Default)]
pub struct Collaborators {
    /// Scraped repository statistics.
    pub spider: Option<Arc<dyn RepositorySpider>>,
    /// Vulnerability records.
    pub vulnerabilities: Option<Arc<dyn VulnerabilitySource>>,
    /// Antivirus scanning.
    pub scanner: Option<Arc<dyn VirusScanner>>,
}
