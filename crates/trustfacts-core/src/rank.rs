// SPDX-License-Identifier: Apache-2.0

//! Rank lookup in a descending-sorted paginated listing.
//!
//! Finds the 0-based position of one item inside a listing sorted
//! descending by a numeric key (repositories by stars, for example) while
//! fetching O(log P) pages, where P is the page count.
//!
//! When several items share the target's key, the run of equal keys may
//! spill across page edges. If the bracketing page does not hold the target
//! identity, neighbouring pages are scanned outward for as long as they still
//! bracket the key; if none holds it, the item is reported as not found.

use tracing::{debug, instrument};

use crate::fetch::{FetchError, Item, Page, field_str, field_u64};
use crate::pagination::PageSource;

/// The item whose rank is wanted.
#[derive(Debug, Clone, Copy)]
pub struct RankTarget<'a> {
    /// Identity value to match, compared ASCII case-insensitively.
    pub identity: &'a str,
    /// Sort key value of the target.
    pub key: u64,
    /// Field holding the identity (`full_name`).
    pub identity_field: &'a str,
    /// Field holding the sort key (`stargazers_count`).
    pub key_field: &'a str,
}

impl RankTarget<'_> {
    fn matches(&self, item: &Item) -> Result<bool, FetchError> {
        Ok(field_str(item, self.identity_field)?.eq_ignore_ascii_case(self.identity))
    }
}

/// Exclusive page-number bounds known to bracket the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SearchWindow {
    lower_bound: u32,
    upper_bound: u32,
}

impl SearchWindow {
    fn is_exhausted(&self) -> bool {
        self.upper_bound - self.lower_bound <= 1
    }

    fn midpoint(&self) -> u32 {
        self.lower_bound + (self.upper_bound - self.lower_bound) / 2
    }
}

/// Highest and lowest key on a page (first and last item).
#[derive(Debug, Clone, Copy)]
struct KeyRange {
    max: u64,
    min: u64,
}

impl KeyRange {
    fn of(page: &Page, key_field: &str) -> Result<Self, FetchError> {
        let (Some(first), Some(last)) = (page.items.first(), page.items.last()) else {
            return Err(FetchError::Malformed("empty page in ranked listing".to_string()));
        };
        Ok(Self {
            max: field_u64(first, key_field)?,
            min: field_u64(last, key_field)?,
        })
    }

    fn brackets(&self, key: u64) -> bool {
        self.min <= key && key <= self.max
    }
}

/// Finds the 0-based rank of `target` in a descending listing.
///
/// Returns `Ok(None)` when the target falls outside the indexed range or is
/// not present. Any fetch failure aborts the search with that error.
#[instrument(skip(source), fields(identity = target.identity, key = target.key))]
pub async fn find_rank<S>(
    source: &mut S,
    target: &RankTarget<'_>,
) -> Result<Option<u64>, FetchError>
where
    S: PageSource + ?Sized,
{
    let first = source.page(1).await?;
    let page_count = first.page_count()?;

    if page_count <= 1 {
        return rank_on_page(&first, 1, source.page_size(), target);
    }

    let first_range = KeyRange::of(&first, target.key_field)?;
    if first_range.max < target.key {
        debug!(top = first_range.max, "Target ranks above the listing");
        return Ok(None);
    }
    if first_range.brackets(target.key) {
        return resolve(source, &first, 1, page_count, target).await;
    }

    let last = source.page(page_count).await?;
    let last_range = KeyRange::of(&last, target.key_field)?;
    if last_range.min > target.key {
        debug!(lowest = last_range.min, "Target ranks below the indexed range");
        return Ok(None);
    }
    if last_range.brackets(target.key) {
        return resolve(source, &last, page_count, page_count, target).await;
    }

    // Pages 1 and P are already ruled out
    let mut window = SearchWindow {
        lower_bound: 1,
        upper_bound: page_count,
    };
    while !window.is_exhausted() {
        let middle = window.midpoint();
        let page = source.page(middle).await?;
        let range = KeyRange::of(&page, target.key_field)?;

        if range.brackets(target.key) {
            return resolve(source, &page, middle, page_count, target).await;
        }
        if range.min > target.key {
            window.lower_bound = middle;
        } else {
            window.upper_bound = middle;
        }
        debug!(?window, "Narrowed search window");
    }

    Ok(None)
}

/// Looks for the target on a bracketing page, then on neighbours that still
/// bracket the key.
async fn resolve<S>(
    source: &mut S,
    page: &Page,
    number: u32,
    page_count: u32,
    target: &RankTarget<'_>,
) -> Result<Option<u64>, FetchError>
where
    S: PageSource + ?Sized,
{
    let page_size = source.page_size();
    if let Some(rank) = rank_on_page(page, number, page_size, target)? {
        return Ok(Some(rank));
    }

    debug!(page = number, "Key bracketed but identity absent, scanning neighbours");

    for neighbour in (1..number).rev() {
        let candidate = source.page(neighbour).await?;
        if !KeyRange::of(&candidate, target.key_field)?.brackets(target.key) {
            break;
        }
        if let Some(rank) = rank_on_page(&candidate, neighbour, page_size, target)? {
            return Ok(Some(rank));
        }
    }

    for neighbour in number + 1..=page_count {
        let candidate = source.page(neighbour).await?;
        if !KeyRange::of(&candidate, target.key_field)?.brackets(target.key) {
            break;
        }
        if let Some(rank) = rank_on_page(&candidate, neighbour, page_size, target)? {
            return Ok(Some(rank));
        }
    }

    Ok(None)
}

fn rank_on_page(
    page: &Page,
    number: u32,
    page_size: u32,
    target: &RankTarget<'_>,
) -> Result<Option<u64>, FetchError> {
    for (index, item) in page.items.iter().enumerate() {
        if target.matches(item)? {
            let offset = u64::from(number.saturating_sub(1)) * u64::from(page_size);
            return Ok(Some(offset + index as u64));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::testing::MemoryPages;

    fn repo(index: usize, stars: u64) -> Value {
        json!({ "full_name": format!("owner/repo-{index}"), "stargazers_count": stars })
    }

    /// Strictly descending star counts: item `i` has `2 * (n - i)` stars.
    fn ranking(n: usize) -> Vec<Value> {
        (0..n).map(|i| repo(i, 2 * (n - i) as u64)).collect()
    }

    fn target_for<'a>(items: &'a [Value], index: usize) -> RankTarget<'a> {
        RankTarget {
            identity: items[index]["full_name"].as_str().unwrap(),
            key: items[index]["stargazers_count"].as_u64().unwrap(),
            identity_field: "full_name",
            key_field: "stargazers_count",
        }
    }

    #[tokio::test]
    async fn test_finds_every_existing_item() {
        let items = ranking(1000);
        for index in [0, 1, 9, 10, 99, 100, 101, 499, 500, 899, 900, 989, 990, 999] {
            let mut source = MemoryPages::new(&items, 10);
            let rank = find_rank(&mut source, &target_for(&items, index))
                .await
                .unwrap();
            assert_eq!(rank, Some(index as u64), "index {index}");
        }
    }

    #[tokio::test]
    async fn test_fetch_count_is_logarithmic() {
        let items = ranking(1000);
        // 100 pages: ceil(log2(100)) = 7, plus the first and last page
        let bound = 7 + 3;
        for index in (0..1000).step_by(37) {
            let mut source = MemoryPages::new(&items, 10);
            find_rank(&mut source, &target_for(&items, index))
                .await
                .unwrap();
            assert!(
                source.fetch_count() <= bound,
                "index {index} took {} fetches",
                source.fetch_count()
            );
        }
    }

    #[tokio::test]
    async fn test_search_never_refetches_first_page() {
        let items = ranking(30);
        let mut source = MemoryPages::new(&items, 10);

        let rank = find_rank(&mut source, &target_for(&items, 15)).await.unwrap();

        assert_eq!(rank, Some(15));
        assert_eq!(source.fetched, vec![1, 3, 2]);
    }

    #[tokio::test]
    async fn test_key_between_two_pages_is_not_found() {
        // Two pages, key falls in the gap between them
        let items = ranking(20);
        let mut source = MemoryPages::new(&items, 10);
        let target = RankTarget {
            identity: "someone/odd",
            key: 21,
            identity_field: "full_name",
            key_field: "stargazers_count",
        };

        assert_eq!(find_rank(&mut source, &target).await.unwrap(), None);
        assert_eq!(source.fetched, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_key_below_last_page_is_not_found() {
        let items = ranking(1000);
        let mut source = MemoryPages::new(&items, 10);
        let target = RankTarget {
            identity: "someone/unpopular",
            key: 1,
            identity_field: "full_name",
            key_field: "stargazers_count",
        };

        assert_eq!(find_rank(&mut source, &target).await.unwrap(), None);
        assert_eq!(source.fetched, vec![1, 100]);
    }

    #[tokio::test]
    async fn test_key_above_first_page_is_not_found() {
        let items = ranking(100);
        let mut source = MemoryPages::new(&items, 10);
        let target = RankTarget {
            identity: "someone/famous",
            key: 1_000_000,
            identity_field: "full_name",
            key_field: "stargazers_count",
        };

        assert_eq!(find_rank(&mut source, &target).await.unwrap(), None);
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_key_in_gap_is_not_found() {
        let items = ranking(1000);
        let mut source = MemoryPages::new(&items, 10);
        // Odd star counts never occur
        let target = RankTarget {
            identity: "someone/odd",
            key: 1001,
            identity_field: "full_name",
            key_field: "stargazers_count",
        };

        assert_eq!(find_rank(&mut source, &target).await.unwrap(), None);
        assert!(source.fetch_count() <= 10);
    }

    #[tokio::test]
    async fn test_single_page_listing() {
        let items = ranking(7);
        let mut source = MemoryPages::new(&items, 10);

        let rank = find_rank(&mut source, &target_for(&items, 4)).await.unwrap();

        assert_eq!(rank, Some(4));
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_partial_last_page() {
        let items = ranking(95);
        let mut source = MemoryPages::new(&items, 10);

        let rank = find_rank(&mut source, &target_for(&items, 93)).await.unwrap();

        assert_eq!(rank, Some(93));
    }

    #[tokio::test]
    async fn test_identity_match_ignores_ascii_case() {
        let items = ranking(50);
        let mut source = MemoryPages::new(&items, 10);
        let target = RankTarget {
            identity: "OWNER/Repo-23",
            ..target_for(&items, 23)
        };

        assert_eq!(find_rank(&mut source, &target).await.unwrap(), Some(23));
    }

    #[tokio::test]
    async fn test_tied_keys_spilling_across_pages() {
        // Page size 3: the run of 7s spans pages 2 and 3
        let stars = [20, 19, 18, 17, 7, 7, 7, 7, 7, 3, 2, 1];
        let items: Vec<Value> = stars
            .iter()
            .enumerate()
            .map(|(i, s)| repo(i, *s))
            .collect();

        for index in 4..=8 {
            let mut source = MemoryPages::new(&items, 3);
            let rank = find_rank(&mut source, &target_for(&items, index))
                .await
                .unwrap();
            assert_eq!(rank, Some(index as u64), "index {index}");
        }
    }

    #[tokio::test]
    async fn test_tied_key_with_absent_identity_terminates() {
        let stars = [20, 19, 18, 7, 7, 7, 7, 7, 7, 3, 2, 1];
        let items: Vec<Value> = stars
            .iter()
            .enumerate()
            .map(|(i, s)| repo(i, *s))
            .collect();
        let mut source = MemoryPages::new(&items, 3);
        let target = RankTarget {
            identity: "owner/not-listed",
            key: 7,
            identity_field: "full_name",
            key_field: "stargazers_count",
        };

        assert_eq!(find_rank(&mut source, &target).await.unwrap(), None);
        assert!(source.fetch_count() <= 8);
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts() {
        let items = ranking(1000);
        let mut source = MemoryPages::new(&items, 10).failing_on(100);

        let result = find_rank(&mut source, &target_for(&items, 500)).await;

        assert!(matches!(result, Err(FetchError::Transient { .. })));
    }

    #[tokio::test]
    async fn test_missing_key_field_is_malformed() {
        let items: Vec<Value> = (0..30)
            .map(|i| json!({ "full_name": format!("owner/repo-{i}") }))
            .collect();
        let mut source = MemoryPages::new(&items, 10);
        let target = RankTarget {
            identity: "owner/repo-15",
            key: 5,
            identity_field: "full_name",
            key_field: "stargazers_count",
        };

        assert!(matches!(
            find_rank(&mut source, &target).await,
            Err(FetchError::Malformed(_))
        ));
    }
}
