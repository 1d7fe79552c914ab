// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! # Trustfacts Core
//!
//! Core library for Trustfacts - trust metrics for open-source packages.
//!
//! This crate provides reusable components for:
//! - Quota-gated access to rate-limited APIs
//! - Counting and ranking inside paginated listings with few page fetches
//! - GitHub, Libraries.io, and Stack Overflow metric providers
//! - Aggregating a metric request into one JSON document
//! - Configuration management
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use trustfacts_core::{Collaborators, MetricRequest, StaticTokens, collect, load_config};
//!
//! # async fn example() -> trustfacts_core::Result<()> {
//! let config = load_config()?;
//! let request = MetricRequest::from_json(
//!     r#"{
//!         "project_info": {
//!             "project_platform": "npm",
//!             "project_owner": "expressjs",
//!             "project_name": "express",
//!             "project_release": "4.18.2"
//!         },
//!         "gh_data_points": ["gh_contributor_count", "gh_gitstar_ranking"]
//!     }"#,
//! )?;
//!
//! let output = collect(&request, &StaticTokens::default(), &config, Collaborators::default()).await?;
//! println!("{}", serde_json::Value::Object(output));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`fetch`] - Page model and the fetch collaborator contract
//! - [`quota`] - Call budgets per API category
//! - [`pagination`], [`rank`], [`boundary`], [`release`] - Paginated search
//!   algorithms
//! - [`github`], [`libraries`], [`stackoverflow`] - Metric providers
//! - [`aggregator`] - Request dispatch
//! - [`config`] - Configuration loading and paths

// ============================================================================
// Authentication
// ============================================================================

pub use auth::{StaticTokens, TokenProvider};

// ============================================================================
// Error Handling
// ============================================================================

pub use error::TrustError;

/// Convenience Result type for Trustfacts operations.
///
/// This is equivalent to `std::result::Result<T, TrustError>`.
pub type Result<T> = std::result::Result<T, TrustError>;

// ============================================================================
// Configuration
// ============================================================================

pub use config::{
    AppConfig, GitHubConfig, LibrariesConfig, RetryConfig, StackOverflowConfig, config_dir,
    config_file_path, load_config,
};

// ============================================================================
// Fetching
// ============================================================================

pub use fetch::{ApiCategory, FetchError, Item, Page, PageFetcher, PageLinks};
pub use http::{Credential, HttpPageFetcher};
pub use retry::{RetryPolicy, RetryingFetcher, is_retryable_http};

// ============================================================================
// Quota Tracking
// ============================================================================

pub use github::ratelimit::{RateLimitBucket, RateLimitStatus};
pub use quota::{Quota, QuotaTracker};

// ============================================================================
// Search Algorithms
// ============================================================================

pub use boundary::count_prefix;
pub use pagination::{PageSource, count_items, total_from_pages};
pub use rank::{RankTarget, find_rank};
pub use release::{ReleaseWindow, resolve_window};

// ============================================================================
// Metric Providers
// ============================================================================

pub use collaborators::{
    Collaborators, RepositorySpider, VirusScanner, Vulnerability, VulnerabilitySource,
};
pub use github::GitHubSession;
pub use libraries::LibrariesClient;
pub use stackoverflow::Popularity;

// ============================================================================
// Aggregation
// ============================================================================

pub use aggregator::{
    Aggregator, CveMetric, GitHubMetric, LibrariesMetric, MetricRequest, ProjectInfo,
    StackOverflowMetric, UnknownMetric,
};

// ============================================================================
// Platform-Agnostic Facade
// ============================================================================

pub use facade::{build_aggregator, collect, quota_status};

// ============================================================================
// Modules
// ============================================================================

pub mod aggregator;
pub mod auth;
pub mod boundary;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod facade;
pub mod fetch;
pub mod github;
pub mod http;
pub mod libraries;
pub mod pagination;
pub mod quota;
pub mod rank;
pub mod release;
pub mod retry;
pub mod stackoverflow;

#[cfg(test)]
pub(crate) mod testing;
