// SPDX-License-Identifier: Apache-2.0

//! Page-number addressed listings and total counting.
//!
//! Algorithms in this crate address a remote listing by 1-based page number
//! through [`PageSource`], so they can be exercised against in-memory data
//! without constructing real URLs.

use async_trait::async_trait;
use tracing::debug;

use crate::fetch::{FetchError, Page};

/// A paginated listing with a fixed page size.
#[async_trait]
pub trait PageSource: Send {
    /// Fetches page `number` (1-based).
    async fn page(&mut self, number: u32) -> Result<Page, FetchError>;

    /// Fixed number of items per full page.
    fn page_size(&self) -> u32;
}

/// Total item count from the page count and the size of the final page.
///
/// `(page_count - 1) * page_size + last_page_len`
#[must_use]
pub fn total_from_pages(page_count: u32, page_size: u32, last_page_len: usize) -> u64 {
    u64::from(page_count.saturating_sub(1)) * u64::from(page_size) + last_page_len as u64
}

/// Counts every item of a listing given its first page.
///
/// A first page without a `last` relation is the whole listing. Otherwise
/// only the final page is fetched. Any failure makes the whole count
/// unknown; a partial total is never returned.
pub async fn count_items<S>(first: &Page, source: &mut S) -> Result<u64, FetchError>
where
    S: PageSource + ?Sized,
{
    let page_count = first.page_count()?;
    if page_count <= 1 {
        return Ok(first.items.len() as u64);
    }

    let last = source.page(page_count).await?;
    let total = total_from_pages(page_count, source.page_size(), last.items.len());
    debug!(page_count, last_page_len = last.items.len(), total, "Counted listing");
    Ok(total)
}

/// Visits every page of a listing in order, following `next` relations.
pub async fn walk_pages<S, F>(source: &mut S, mut visit: F) -> Result<u32, FetchError>
where
    S: PageSource + ?Sized,
    F: FnMut(&Page) -> Result<(), FetchError> + Send,
{
    let mut number = 1;
    loop {
        let page = source.page(number).await?;
        visit(&page)?;
        if !page.has_next() {
            return Ok(number);
        }
        number += 1;
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::testing::MemoryPages;

    fn items(n: usize) -> Vec<Value> {
        (0..n).map(|i| json!({ "id": i })).collect()
    }

    #[test]
    fn test_total_from_pages_identity() {
        for (pages, size, last) in [(1, 100, 37), (3, 100, 50), (2, 30, 30), (10, 1, 1)] {
            assert_eq!(
                total_from_pages(pages, size, last),
                u64::from(pages - 1) * u64::from(size) + last as u64
            );
        }
    }

    #[test]
    fn test_total_from_pages_single_page() {
        assert_eq!(total_from_pages(1, 100, 42), 42);
    }

    #[tokio::test]
    async fn test_count_items_partial_last_page() {
        let mut source = MemoryPages::new(&items(250), 100);
        let first = source.page(1).await.unwrap();

        assert_eq!(count_items(&first, &mut source).await.unwrap(), 250);
        assert_eq!(source.fetched, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_count_items_single_page() {
        let mut source = MemoryPages::new(&items(42), 100);
        let first = source.page(1).await.unwrap();

        assert_eq!(count_items(&first, &mut source).await.unwrap(), 42);
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_count_items_empty_listing() {
        let mut source = MemoryPages::new(&[], 100);
        let first = source.page(1).await.unwrap();

        assert_eq!(count_items(&first, &mut source).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_count_items_exact_multiple() {
        let mut source = MemoryPages::new(&items(300), 100);
        let first = source.page(1).await.unwrap();

        assert_eq!(count_items(&first, &mut source).await.unwrap(), 300);
    }

    #[tokio::test]
    async fn test_count_items_last_page_failure_is_unknown() {
        let mut source = MemoryPages::new(&items(250), 100).failing_on(3);
        let first = source.page(1).await.unwrap();

        assert!(count_items(&first, &mut source).await.is_err());
    }

    #[tokio::test]
    async fn test_walk_pages_visits_all() {
        let mut source = MemoryPages::new(&items(25), 10);
        let mut seen = 0;

        let pages = walk_pages(&mut source, |page| {
            seen += page.items.len();
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(pages, 3);
        assert_eq!(seen, 25);
    }
}
