// SPDX-License-Identifier: Apache-2.0

//! CLI-specific error formatting with user-friendly hints.
//!
//! Downcasts `anyhow::Error` to `TrustError` or `FetchError` and appends a
//! hint for the error kinds a user can act on.

use anyhow::Error;
use trustfacts_core::{FetchError, TrustError};

const QUOTA_HINT: &str = "Tip: Set GITHUB_TOKEN for a larger quota, or wait for the window to reset (see `trustfacts quota`).";

const AUTH_HINT: &str = "Tip: Check the GITHUB_TOKEN and LIBRARIES_TOKEN environment variables.";

/// Formats an error for CLI display with helpful hints.
///
/// Errors that are neither a `TrustError` nor a `FetchError` are shown with
/// their context chain.
///
/// # Arguments
///
/// * `error` - The error to format
///
/// # Returns
///
/// A formatted error message with hints
pub fn format_error(error: &Error) -> String {
    if let Some(trust_err) = error.downcast_ref::<TrustError>() {
        return match trust_err {
            TrustError::Fetch(fetch_err) => format_fetch_error(fetch_err),
            TrustError::InvalidRequest { .. } => format!(
                "{trust_err}\n\nTip: A request needs `project_info` with project_platform, project_owner, project_name, and project_release."
            ),
            TrustError::Config { .. } => format!(
                "{trust_err}\n\nTip: Check your config file at {}",
                trustfacts_core::config_file_path().display()
            ),
            TrustError::Network(_) => {
                format!("{trust_err}\n\nTip: Check your internet connection and try again.")
            }
        };
    }

    if let Some(fetch_err) = error.downcast_ref::<FetchError>() {
        return format_fetch_error(fetch_err);
    }

    format!("{error:#}")
}

fn format_fetch_error(error: &FetchError) -> String {
    match error {
        FetchError::QuotaExceeded(_) => format!("{error}\n\n{QUOTA_HINT}"),
        FetchError::Unauthorized => format!("{error}\n\n{AUTH_HINT}"),
        FetchError::Transient { .. } | FetchError::RateLimited { .. } => {
            format!("{error}\n\nTip: The service is busy. Try again in a moment.")
        }
        FetchError::NotFound { .. } | FetchError::Malformed(_) => error.to_string(),
    }
}
