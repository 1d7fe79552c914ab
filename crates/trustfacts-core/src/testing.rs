// SPDX-License-Identifier: Apache-2.0

//! In-memory fetch doubles shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::fetch::{ApiCategory, FetchError, Page, PageFetcher, PageLinks};
use crate::pagination::PageSource;

/// Base URL used for synthetic listings.
pub const LISTING_URL: &str = "https://api.test/items";

/// Fetcher answering from a fixed URL table and recording every call.
#[derive(Default)]
pub struct FakeFetcher {
    responses: Mutex<HashMap<String, VecDeque<Result<Page, FetchError>>>>,
    calls: Mutex<Vec<(String, ApiCategory)>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for `url`. The last queued response repeats.
    pub fn respond(&self, url: &str, response: Result<Page, FetchError>) {
        self.responses
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    /// Queues a JSON body for `url`.
    pub fn respond_json(&self, url: &str, body: Value) {
        self.respond(url, Ok(Page::from_json(body, PageLinks::default()).unwrap()));
    }

    /// Serves `items` split into pages, addressed by `{base}&page=N`.
    pub fn respond_listing(&self, base: &str, items: &[Value], page_size: usize) {
        let pages = paginate(base, items, page_size);
        for (index, page) in pages.into_iter().enumerate() {
            let number = index + 1;
            if number == 1 {
                self.respond(base, Ok(page.clone()));
            }
            self.respond(&format!("{base}&page={number}"), Ok(page));
        }
    }

    pub fn calls(&self) -> Vec<(String, ApiCategory)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str, category: ApiCategory) -> Result<Page, FetchError> {
        self.calls.lock().unwrap().push((url.to_string(), category));
        let mut responses = self.responses.lock().unwrap();
        let Some(queue) = responses.get_mut(url) else {
            return Err(FetchError::NotFound {
                url: url.to_string(),
            });
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        }
    }
}

/// Splits `items` into pages carrying `next`/`last` links like GitHub does.
pub fn paginate(base: &str, items: &[Value], page_size: usize) -> Vec<Page> {
    let chunks: Vec<Vec<Value>> = if items.is_empty() {
        vec![Vec::new()]
    } else {
        items.chunks(page_size).map(<[Value]>::to_vec).collect()
    };
    let count = chunks.len();

    chunks
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| {
            let number = index + 1;
            let links = PageLinks {
                next: (number < count).then(|| format!("{base}&page={}", number + 1)),
                last: (count > 1).then(|| format!("{base}&page={count}")),
            };
            Page::new(chunk).with_links(links)
        })
        .collect()
}

/// Page source over an in-memory listing that counts fetches.
pub struct MemoryPages {
    pages: Vec<Page>,
    page_size: u32,
    pub fetched: Vec<u32>,
    fail_on: Option<u32>,
}

impl MemoryPages {
    pub fn new(items: &[Value], page_size: u32) -> Self {
        Self {
            pages: paginate(&format!("{LISTING_URL}?per_page={page_size}"), items, page_size as usize),
            page_size,
            fetched: Vec::new(),
            fail_on: None,
        }
    }

    /// Makes fetching page `number` fail with a transient error.
    pub fn failing_on(mut self, number: u32) -> Self {
        self.fail_on = Some(number);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.len()
    }
}

#[async_trait]
impl PageSource for MemoryPages {
    async fn page(&mut self, number: u32) -> Result<Page, FetchError> {
        self.fetched.push(number);
        if self.fail_on == Some(number) {
            return Err(FetchError::Transient {
                message: "connection reset".to_string(),
                retry_after: None,
            });
        }
        let index = number
            .checked_sub(1)
            .ok_or_else(|| FetchError::Malformed("page 0 requested".to_string()))?;
        Ok(self
            .pages
            .get(index as usize)
            .cloned()
            .unwrap_or_default())
    }

    fn page_size(&self) -> u32 {
        self.page_size
    }
}

/// Status payload in GitHub's `/rate_limit` shape.
pub fn rate_limit_body(core: u64, search: u64) -> Value {
    json!({
        "resources": {
            "core": {"limit": 5000, "remaining": core, "reset": 1_700_000_000},
            "search": {"limit": 30, "remaining": search, "reset": 1_700_000_000}
        },
        "rate": {"limit": 5000, "remaining": core, "reset": 1_700_000_000}
    })
}
