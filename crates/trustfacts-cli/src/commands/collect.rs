// SPDX-License-Identifier: Apache-2.0

//! Collect command: evaluate a metric request document.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::{debug, instrument};
use trustfacts_core::{AppConfig, Collaborators, MetricRequest};

use crate::provider::EnvTokenProvider;

/// Reads the request from `path`, `-` meaning stdin.
fn read_request(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut document = String::new();
        std::io::stdin()
            .read_to_string(&mut document)
            .context("Failed to read request from stdin")?;
        return Ok(document);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request from {}", path.display()))
}

/// Collects the metrics named in the request document at `path`.
#[instrument(skip(config))]
pub async fn run(path: &Path, config: &AppConfig) -> Result<Map<String, Value>> {
    let document = read_request(path)?;
    let request = MetricRequest::from_json(&document)?;
    debug!(
        github = request.gh_data_points.len(),
        libraries = request.lib_data_points.len(),
        "Parsed metric request"
    );

    let output =
        trustfacts_core::collect(&request, &EnvTokenProvider, config, Collaborators::default())
            .await?;
    Ok(output)
}

/// Serializes the result object.
pub fn render(output: &Map<String, Value>, pretty: bool) -> Result<String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(output)?
    } else {
        serde_json::to_string(output)?
    };
    Ok(rendered)
}
