// SPDX-License-Identifier: Apache-2.0

//! Quota command: show the remaining GitHub API budgets.

use anyhow::Result;
use trustfacts_core::{AppConfig, RateLimitStatus};

use crate::provider::EnvTokenProvider;

/// Reads the current GitHub rate limit status.
pub async fn run(config: &AppConfig) -> Result<RateLimitStatus> {
    Ok(trustfacts_core::quota_status(&EnvTokenProvider, config).await?)
}
