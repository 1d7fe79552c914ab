// SPDX-License-Identifier: Apache-2.0

//! Configuration management.
//!
//! Provides layered configuration from files and environment variables.
//! Uses XDG-compliant paths with environment variable support.
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Environment variables (prefix: `TRUSTFACTS_`)
//! 2. Config file: `~/.config/trustfacts/config.toml`
//! 3. Built-in defaults
//!
//! # Examples
//!
//! ```bash
//! # Use a GitHub Enterprise endpoint
//! TRUSTFACTS_GITHUB__API_URL=https://ghe.example.com/api/v3 trustfacts quota
//! ```

use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::TrustError;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// GitHub API settings.
    pub github: GitHubConfig,
    /// Libraries.io API settings.
    pub libraries: LibrariesConfig,
    /// Stack Overflow trends settings.
    pub stackoverflow: StackOverflowConfig,
    /// Retry behavior for transient failures.
    pub retry: RetryConfig,
}

/// GitHub API settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Base URL of the REST API.
    pub api_url: String,
    /// Items requested per page for paginated listings.
    pub page_size: u32,
    /// API request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            page_size: 100,
            timeout_seconds: 10,
        }
    }
}

impl GitHubConfig {
    /// URL of the rate limit status endpoint.
    #[must_use]
    pub fn rate_limit_url(&self) -> String {
        format!("{}/rate_limit", self.api_url.trim_end_matches('/'))
    }
}

/// Libraries.io API settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrariesConfig {
    /// Base URL of the API.
    pub api_url: String,
    /// API request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for LibrariesConfig {
    fn default() -> Self {
        Self {
            api_url: "https://libraries.io/api".to_string(),
            timeout_seconds: 10,
        }
    }
}

/// Stack Overflow trends settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StackOverflowConfig {
    /// URL of the trends data feed.
    pub trends_url: String,
    /// Feed request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for StackOverflowConfig {
    fn default() -> Self {
        Self {
            trends_url: "https://insights.stackoverflow.com/trends/get-data".to_string(),
            timeout_seconds: 30,
        }
    }
}

/// Retry settings for transient failures.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    /// Wait for rate limit responses without `Retry-After`, in seconds.
    pub fallback_delay_seconds: u64,
    /// Upper bound on any single wait, in seconds.
    pub max_retry_after_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            fallback_delay_seconds: 30,
            max_retry_after_seconds: 120,
        }
    }
}

/// Returns the trustfacts configuration directory.
///
/// Respects the `XDG_CONFIG_HOME` environment variable if set,
/// otherwise defaults to `~/.config/trustfacts`.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        return PathBuf::from(xdg_config).join("trustfacts");
    }
    dirs::home_dir()
        .unwrap_or_default()
        .join(".config")
        .join("trustfacts")
}

/// Returns the path to the configuration file.
#[must_use]
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Load application configuration.
///
/// Loads from config file (if exists) and environment variables.
/// Environment variables use the prefix `TRUSTFACTS_` and double underscore
/// for nested keys (e.g., `TRUSTFACTS_RETRY__MAX_ATTEMPTS`).
///
/// # Errors
///
/// Returns `TrustError::Config` if the config file exists but is invalid.
pub fn load_config() -> Result<AppConfig, TrustError> {
    let config_path = config_file_path();

    let config = Config::builder()
        .add_source(File::with_name(config_path.to_string_lossy().as_ref()).required(false))
        .add_source(
            Environment::with_prefix("TRUSTFACTS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(config.try_deserialize()?)
}
