//! Pagination walker
//!
//! Walks the listing pages of the storefront one at a time and yields every
//! newly discovered item URL. Pages are fetched lazily: the next listing page
//! is only requested once the consumer has drained the items of the current
//! one.

use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::parse_listing;
use crate::url::{item_identifier, pagination_key};
use crate::HarvestError;
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use url::Url;

/// A pull-based source of item URLs
#[async_trait]
pub trait ItemSource: Send {
    /// Returns the next item URL, or None once the source is exhausted
    async fn next_item(&mut self) -> Result<Option<Url>, HarvestError>;
}

/// Fixed item lists, mostly useful for re-processing known URLs
#[async_trait]
impl ItemSource for std::vec::IntoIter<Url> {
    async fn next_item(&mut self) -> Result<Option<Url>, HarvestError> {
        Ok(self.next())
    }
}

/// Traversal state of the walker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkState {
    /// The given listing page is the next one to fetch
    AtPage(Url),
    /// A listing page is being fetched and parsed
    Advancing,
    /// The last page had no next page, or the walk was aborted
    Exhausted,
    /// The next page had already been visited during this walk
    Cycled,
}

impl WalkState {
    /// Returns true if no further page will be fetched
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exhausted | Self::Cycled)
    }
}

/// Walks paginated listing pages and yields new item URLs in page order
///
/// Items are deduplicated across pages by identifier at emission time,
/// independently of whether downstream processing later succeeds. A listing
/// page that cannot be fetched aborts the walk with
/// [`HarvestError::Structural`]; it is never retried.
pub struct PaginationWalker {
    fetcher: Arc<dyn PageFetcher>,
    item_prefix: String,
    state: WalkState,
    page_index: u32,
    pages_walked: usize,
    visited: HashSet<String>,
    emitted: HashSet<String>,
    pending: VecDeque<Url>,
}

impl PaginationWalker {
    /// Creates a walker starting at `start_url` as page one
    pub fn new(fetcher: Arc<dyn PageFetcher>, start_url: Url, item_prefix: impl Into<String>) -> Self {
        Self {
            fetcher,
            item_prefix: item_prefix.into(),
            state: WalkState::AtPage(start_url),
            page_index: 1,
            pages_walked: 0,
            visited: HashSet::new(),
            emitted: HashSet::new(),
            pending: VecDeque::new(),
        }
    }

    /// Current traversal state
    pub fn state(&self) -> &WalkState {
        &self.state
    }

    /// Number of listing pages fetched so far
    pub fn pages_walked(&self) -> usize {
        self.pages_walked
    }

    /// Number of distinct items emitted so far
    pub fn items_emitted(&self) -> usize {
        self.emitted.len()
    }

    /// Returns the next new item URL, fetching listing pages as needed
    pub async fn next_item(&mut self) -> Result<Option<Url>, HarvestError> {
        loop {
            if let Some(url) = self.pending.pop_front() {
                return Ok(Some(url));
            }

            match std::mem::replace(&mut self.state, WalkState::Advancing) {
                WalkState::AtPage(page_url) => self.walk_page(page_url).await?,
                WalkState::Cycled => {
                    self.state = WalkState::Cycled;
                    return Ok(None);
                }
                WalkState::Exhausted | WalkState::Advancing => {
                    self.state = WalkState::Exhausted;
                    return Ok(None);
                }
            }
        }
    }

    /// Fetches and parses one listing page, queueing its new items
    async fn walk_page(&mut self, page_url: Url) -> Result<(), HarvestError> {
        self.visited.insert(pagination_key(&page_url));

        let html = match self.fetcher.fetch(&page_url).await {
            Ok(html) => html,
            Err(e) => {
                self.state = WalkState::Exhausted;
                tracing::error!("Listing page {} could not be fetched: {}", page_url, e);
                return Err(HarvestError::Structural {
                    url: page_url.to_string(),
                    message: e.to_string(),
                });
            }
        };

        let parsed = match parse_listing(&html, &page_url, self.page_index, &self.item_prefix) {
            Ok(parsed) => parsed,
            Err(message) => {
                self.state = WalkState::Exhausted;
                tracing::error!("Listing page {} could not be parsed: {}", page_url, message);
                return Err(HarvestError::Structural {
                    url: page_url.to_string(),
                    message,
                });
            }
        };
        self.pages_walked += 1;

        let found = parsed.item_urls.len();
        let mut new_items = 0;
        for item_url in parsed.item_urls {
            let identifier = item_identifier(&item_url, &self.item_prefix)
                .unwrap_or_else(|| item_url.to_string());
            if self.emitted.insert(identifier) {
                self.pending.push_back(item_url);
                new_items += 1;
            }
        }

        tracing::info!(
            "Listing page {} ({}): {} items, {} new",
            self.page_index,
            page_url,
            found,
            new_items
        );

        self.state = match parsed.next_page {
            None => {
                tracing::info!("No next page after page {}, pagination exhausted", self.page_index);
                WalkState::Exhausted
            }
            Some(next) if self.visited.contains(&pagination_key(&next.url)) => {
                tracing::warn!(
                    "Next page {} was already visited, stopping to avoid a pagination cycle",
                    next.url
                );
                WalkState::Cycled
            }
            Some(next) => {
                self.page_index = next.page_number.unwrap_or(self.page_index + 1);
                WalkState::AtPage(next.url)
            }
        };

        Ok(())
    }
}

#[async_trait]
impl ItemSource for PaginationWalker {
    async fn next_item(&mut self) -> Result<Option<Url>, HarvestError> {
        PaginationWalker::next_item(self).await
    }
}
