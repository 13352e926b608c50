//! URL handling module for Catalog-Harvest
//!
//! This module canonicalizes item links, pagination links and the keys used
//! to compare them. Item links are constrained to the storefront's item path
//! shape; pagination links only need to be navigable.

mod normalize;

use crate::{UrlError, UrlResult};
use ::url::Url;

// Re-export main functions
pub use normalize::{
    item_identifier, item_identifier_from_str, normalize_item_link, normalize_navigation_link,
    pagination_key, DEFAULT_ITEM_PATH_PREFIX,
};

/// Parses a configured listing URL, accepting only HTTP and HTTPS
///
/// # Examples
///
/// ```
/// use catalog_harvest::url::parse_listing_url;
///
/// assert!(parse_listing_url("https://shop.example/artist/a/").is_ok());
/// assert!(parse_listing_url("ftp://shop.example/").is_err());
/// ```
pub fn parse_listing_url(raw: &str) -> UrlResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::Parse(format!("missing host in {}", raw)));
    }

    Ok(url)
}

/// Resolves the identifier of an item URL or reports why it has none
pub fn require_item_identifier(url: &Url, prefix: &str) -> UrlResult<String> {
    item_identifier(url, prefix).ok_or_else(|| UrlError::NotAnItem(url.to_string()))
}
