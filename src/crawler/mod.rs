//! Crawler module for listing traversal and item processing
//!
//! This module contains the core harvesting logic, including:
//! - Page fetching behind the `PageFetcher` interface
//! - Listing page parsing and pagination walking
//! - Request spacing
//! - The per-item pipeline

mod coordinator;
mod fetcher;
mod parser;
mod rate_limiter;
mod walker;

pub use coordinator::{
    run_harvest, HarvestOptions, Pipeline, PipelineOptions, ProcessingError, RunResult, Stage,
};
pub use fetcher::{build_http_client, user_agent_string, FetchError, HttpFetcher, PageFetcher};
pub use parser::{parse_listing, ListingPageResult, NextPage};
pub use rate_limiter::RateLimiter;
pub use walker::{ItemSource, PaginationWalker, WalkState};

use crate::config::Config;
use crate::url::parse_listing_url;
use crate::HarvestError;
use std::sync::Arc;
use url::Url;

/// Walks the listing pages without fetching any item
///
/// Used for dry runs: returns every item URL the harvest would visit, in
/// order.
///
/// # Arguments
///
/// * `config` - The harvest configuration
/// * `limit` - Stop after this many item URLs
///
/// # Returns
///
/// * `Ok(Vec<Url>)` - Discovered item URLs
/// * `Err(HarvestError)` - A listing page could not be fetched or parsed
pub async fn discover_items(config: &Config, limit: Option<usize>) -> Result<Vec<Url>, HarvestError> {
    let listing_url = parse_listing_url(&config.crawler.listing_url)?;
    let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::from_config(&config.user_agent)?);
    let mut walker = PaginationWalker::new(
        fetcher,
        listing_url,
        config.crawler.item_path_prefix.clone(),
    );

    let mut urls = Vec::new();
    while limit.map_or(true, |max| urls.len() < max) {
        match walker.next_item().await? {
            Some(url) => urls.push(url),
            None => break,
        }
    }

    tracing::info!(
        "Discovered {} items across {} listing pages",
        urls.len(),
        walker.pages_walked()
    );

    Ok(urls)
}

/// Runs a complete harvest with the switches from the configuration
///
/// # Arguments
///
/// * `config` - The harvest configuration
///
/// # Returns
///
/// * `Ok(RunResult)` - Harvest finished, possibly with per-item errors
/// * `Err(HarvestError)` - Harvest aborted
pub async fn harvest(config: &Config) -> Result<RunResult<crate::Artwork>, HarvestError> {
    run_harvest(config, HarvestOptions::from_config(config)).await
}
