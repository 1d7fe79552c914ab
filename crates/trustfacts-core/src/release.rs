// SPDX-License-Identifier: Apache-2.0

//! Publish window of a release.
//!
//! A release window is the publish time of a tagged release together with the
//! publish time of the release that came right after it. Release listings are
//! ordered newest first, so the successor is the nearest published item above
//! the target, possibly on an earlier page. Drafts carry no publish time and
//! are skipped.

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::fetch::{FetchError, Item, field_str};
use crate::pagination::PageSource;

/// Outcome of a release window lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseWindow {
    /// The release exists.
    Found {
        /// When the release was published.
        published_at: DateTime<Utc>,
        /// When the next release was published; `None` for the newest release.
        successor_published_at: Option<DateTime<Utc>>,
    },
    /// No release carries the requested tag.
    NotFound,
}

impl ReleaseWindow {
    /// Returns `(published_at, successor_published_at)`, both `None` when the
    /// release was not found.
    #[must_use]
    pub fn dates(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        match self {
            ReleaseWindow::Found {
                published_at,
                successor_published_at,
            } => (Some(*published_at), *successor_published_at),
            ReleaseWindow::NotFound => (None, None),
        }
    }

    /// Returns true if the release was found.
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, ReleaseWindow::Found { .. })
    }
}

fn is_draft(item: &Item) -> bool {
    item.get("draft").and_then(serde_json::Value::as_bool) == Some(true)
}

/// Parses the `published_at` timestamp of a release item.
pub fn published_at(item: &Item) -> Result<DateTime<Utc>, FetchError> {
    let raw = field_str(item, "published_at")?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| FetchError::Malformed(format!("invalid published_at `{raw}`: {e}")))
}

/// Walks a newest-first release listing until `tag` is found.
#[instrument(skip(source))]
pub async fn resolve_window<S>(source: &mut S, tag: &str) -> Result<ReleaseWindow, FetchError>
where
    S: PageSource + ?Sized,
{
    let mut previous_last: Option<Item> = None;
    let mut number = 1;

    loop {
        let page = source.page(number).await?;

        for (index, item) in page.items.iter().enumerate() {
            if field_str(item, "tag_name")? != tag {
                continue;
            }

            let successor = page.items[..index]
                .iter()
                .rev()
                .find(|above| !is_draft(above))
                .or(previous_last.as_ref());
            let successor_published_at = successor.map(published_at).transpose()?;
            debug!(page = number, index, "Found release");

            return Ok(ReleaseWindow::Found {
                published_at: published_at(item)?,
                successor_published_at,
            });
        }

        if !page.has_next() {
            return Ok(ReleaseWindow::NotFound);
        }
        if let Some(last) = page.items.iter().rev().find(|item| !is_draft(item)) {
            previous_last = Some(last.clone());
        }
        number += 1;
    }
}
