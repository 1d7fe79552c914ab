// SPDX-License-Identifier: Apache-2.0

//! Stack Overflow tag popularity from the public trends feed.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::fetch::{ApiCategory, FetchError, PageFetcher};

/// Share of questions asked about one tag in one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Popularity {
    /// Month of the data point (1-12).
    pub month: u32,
    /// Year of the data point.
    pub year: i32,
    /// Percentage of that month's questions carrying the tag.
    pub popularity: f64,
}

/// The trends feed: parallel monthly series.
#[derive(Debug, Deserialize)]
struct TrendsFeed {
    #[serde(rename = "Year")]
    years: Vec<i32>,
    #[serde(rename = "Month")]
    months: Vec<u32>,
    #[serde(rename = "TagPercents")]
    tag_percents: Option<HashMap<String, Vec<f64>>>,
}

impl TrendsFeed {
    fn latest(&self, tag: &str) -> Result<Popularity, FetchError> {
        let percents = self
            .tag_percents
            .as_ref()
            .ok_or_else(|| FetchError::missing_field("TagPercents"))?;

        let (Some(&month), Some(&year)) = (self.months.last(), self.years.last()) else {
            return Err(FetchError::Malformed("trends feed has no months".to_string()));
        };

        let Some(series) = percents.get(tag) else {
            debug!(tag, "Tag not in trends feed");
            return Ok(Popularity {
                month,
                year,
                popularity: 0.0,
            });
        };

        if series.len() != self.months.len() || self.years.len() != self.months.len() {
            return Err(FetchError::Malformed(format!(
                "trends series lengths differ: {} months, {} years, {} values",
                self.months.len(),
                self.years.len(),
                series.len()
            )));
        }

        let popularity = series.last().copied().unwrap_or_default();
        Ok(Popularity {
            month,
            year,
            popularity,
        })
    }
}

/// Latest monthly popularity of `tag`.
///
/// A tag absent from the feed has popularity 0 for the latest month.
///
/// # Errors
///
/// Fails when the feed cannot be fetched, lacks its series, or has series
/// of different lengths.
#[instrument(skip(fetcher, trends_url))]
pub async fn popularity(
    fetcher: &dyn PageFetcher,
    trends_url: &str,
    tag: &str,
) -> Result<Popularity> {
    let page = fetcher
        .fetch(trends_url, ApiCategory::Core)
        .await
        .context("Failed to fetch Stack Overflow trends")?;
    let feed: TrendsFeed = serde_json::from_value(page.object()?.clone())
        .context("Failed to parse Stack Overflow trends")?;
    Ok(feed.latest(tag)?)
}
