// SPDX-License-Identifier: Apache-2.0

//! Error types for trustfacts.
//!
//! Uses `thiserror` for deriving `std::error::Error` implementations.
//! Metric providers and application code use `anyhow::Result`; this enum is
//! what the public facade returns.

use thiserror::Error;

use crate::fetch::FetchError;

/// Errors that can occur while collecting trust facts.
#[derive(Error, Debug)]
pub enum TrustError {
    /// A remote call failed.
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The metric request document is unusable.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// What is wrong with the request.
        message: String,
    },

    /// Configuration file error.
    #[error("Configuration error: {message}")]
    Config {
        /// Error message.
        message: String,
    },

    /// Network/HTTP error from reqwest.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl TrustError {
    /// Creates a [`TrustError::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        TrustError::InvalidRequest {
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for TrustError {
    fn from(err: config::ConfigError) -> Self {
        TrustError::Config {
            message: err.to_string(),
        }
    }
}
