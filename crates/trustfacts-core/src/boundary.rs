// SPDX-License-Identifier: Apache-2.0

//! Length of the predicate-true prefix of a sorted paginated listing.
//!
//! Used for "issues with zero comments": open issues sorted by comment count
//! ascending put every zero-comment issue first, so the answer is the index
//! of the first item with comments. Whole pages are skipped by looking only
//! at their last item, and only the final page is scanned.

use tracing::debug;

use crate::fetch::{FetchError, Item, field_u64};
use crate::pagination::PageSource;

/// Counts the items at the head of the listing for which `predicate` holds.
///
/// The listing must be sorted so that every predicate-true item precedes
/// every predicate-false one. An empty listing counts as 0.
pub async fn count_prefix<S, P>(source: &mut S, predicate: P) -> Result<u64, FetchError>
where
    S: PageSource + ?Sized,
    P: Fn(&Item) -> Result<bool, FetchError> + Send + Sync,
{
    let page_size = u64::from(source.page_size());
    let mut full_pages: u64 = 0;
    let mut page = source.page(1).await?;

    loop {
        let Some(last) = page.items.last() else {
            return Ok(full_pages * page_size);
        };
        if !predicate(last)? {
            break;
        }
        if !page.has_next() {
            let total = full_pages * page_size + page.items.len() as u64;
            debug!(total, "Predicate holds for the whole listing");
            return Ok(total);
        }
        full_pages += 1;
        let next = u32::try_from(full_pages + 1)
            .map_err(|_| FetchError::Malformed("page number overflow".to_string()))?;
        page = source.page(next).await?;
    }

    let mut prefix = 0;
    for item in &page.items {
        if !predicate(item)? {
            break;
        }
        prefix += 1;
    }

    debug!(full_pages, prefix, "Found prefix boundary");
    Ok(full_pages * page_size + prefix)
}

/// Predicate for issues that never received a comment.
pub fn zero_comments(item: &Item) -> Result<bool, FetchError> {
    Ok(field_u64(item, "comments")? == 0)
}
