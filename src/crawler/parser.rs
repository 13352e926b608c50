//! Listing page parser
//!
//! This module handles parsing listing page markup to extract:
//! - Item links, canonicalized and deduplicated in first-seen order
//! - The target of the next listing page, if any

use crate::url::{normalize_item_link, normalize_navigation_link};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Elements that usually wrap a pagination widget
const PAGINATION_CONTAINER_SELECTOR: &str =
    ".pagination, [data-testid='pagination'], nav[aria-label*='pagination' i]";

/// Visible texts that mark an explicit "next page" anchor
const NEXT_MARKERS: &[&str] = &["next", "next page", "›", "»", "→", ">"];

/// Items found on one listing page plus the way forward
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPageResult {
    /// Canonical item URLs in first-seen order, without duplicates
    pub item_urls: Vec<Url>,

    /// The next listing page, if the page links to one
    pub next_page: Option<NextPage>,
}

/// Locator of the following listing page
#[derive(Debug, Clone, PartialEq)]
pub struct NextPage {
    /// Navigation-normalized URL of the page
    pub url: Url,

    /// Page number when the link was chosen from numeric pagination
    pub page_number: Option<u32>,
}

/// Parses a listing page
///
/// # Next Page Resolution
///
/// 1. Anchors inside a pagination container are scanned if such a container
///    exists, otherwise every anchor on the page
/// 2. The first anchor whose text is a "next" marker wins
/// 3. Otherwise, among anchors whose text is a page number greater than
///    `current_page`, the smallest number wins
/// 4. If the containers yielded nothing, steps 2 and 3 are repeated over
///    every anchor on the page
/// 5. Otherwise there is no next page
///
/// A "next" marker always beats numeric links, even when a smaller page
/// number is present.
///
/// # Arguments
///
/// * `html` - The rendered listing markup
/// * `current_url` - URL of the page, used to resolve relative links
/// * `current_page` - One-based index of the page being parsed
/// * `item_prefix` - Path prefix identifying item detail pages
///
/// # Example
///
/// ```
/// use catalog_harvest::crawler::parse_listing;
/// use url::Url;
///
/// let html = r#"<a href="/product/one/">One</a><nav class="pagination"><a href="?page=2">Next</a></nav>"#;
/// let url = Url::parse("https://shop.example/list/").unwrap();
/// let page = parse_listing(html, &url, 1, "/product/").unwrap();
/// assert_eq!(page.item_urls.len(), 1);
/// assert_eq!(page.next_page.unwrap().url.as_str(), "https://shop.example/list/?page=2");
/// ```
pub fn parse_listing(
    html: &str,
    current_url: &Url,
    current_page: u32,
    item_prefix: &str,
) -> Result<ListingPageResult, String> {
    let document = Html::parse_document(html);

    let item_urls = extract_item_links(&document, current_url, item_prefix)?;
    let next_page = find_next_page(&document, current_url, current_page)?;

    Ok(ListingPageResult {
        item_urls,
        next_page,
    })
}

/// Extracts canonical item links in first-seen order
fn extract_item_links(
    document: &Html,
    base_url: &Url,
    item_prefix: &str,
) -> Result<Vec<Url>, String> {
    let anchor_selector = anchor_selector()?;

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&anchor_selector) {
        // Skip if it has the download attribute
        if element.value().attr("download").is_some() {
            continue;
        }

        let href = element.value().attr("href");
        if let Some(item_url) = normalize_item_link(base_url, href, item_prefix) {
            if seen.insert(item_url.as_str().to_string()) {
                links.push(item_url);
            }
        }
    }

    Ok(links)
}

/// Resolves the next listing page
///
/// Pagination containers are consulted first. When they offer no usable
/// candidate, or the page has none, every anchor on the page is scanned.
fn find_next_page(
    document: &Html,
    base_url: &Url,
    current_page: u32,
) -> Result<Option<NextPage>, String> {
    let anchor_selector = anchor_selector()?;

    let contained = pagination_anchors(document, &anchor_selector)?;
    if !contained.is_empty() {
        if let Some(next) = choose_next_page(&contained, base_url, current_page) {
            return Ok(Some(next));
        }
    }

    let all: Vec<ElementRef<'_>> = document.select(&anchor_selector).collect();
    Ok(choose_next_page(&all, base_url, current_page))
}

/// Picks the next page among `anchors`
fn choose_next_page(anchors: &[ElementRef<'_>], base_url: &Url, current_page: u32) -> Option<NextPage> {
    // A "next" marker wins outright
    for anchor in anchors {
        if is_next_marker(&anchor_label(anchor)) {
            if let Some(url) = normalize_navigation_link(base_url, anchor.value().attr("href")) {
                return Some(NextPage {
                    url,
                    page_number: None,
                });
            }
        }
    }

    // Otherwise the closest numbered page after the current one
    let mut best: Option<(u32, Url)> = None;
    for anchor in anchors {
        let number = match page_number(&anchor_label(anchor)) {
            Some(n) if n > current_page => n,
            _ => continue,
        };

        if best.as_ref().is_some_and(|(b, _)| *b <= number) {
            continue;
        }

        if let Some(url) = normalize_navigation_link(base_url, anchor.value().attr("href")) {
            best = Some((number, url));
        }
    }

    best.map(|(number, url)| NextPage {
        url,
        page_number: Some(number),
    })
}

/// Parses a label made of ASCII digits only
fn page_number(label: &str) -> Option<u32> {
    if label.is_empty() || !label.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    label.parse().ok()
}

/// Returns the anchors inside pagination containers
fn pagination_anchors<'a>(
    document: &'a Html,
    anchor_selector: &Selector,
) -> Result<Vec<ElementRef<'a>>, String> {
    let container_selector = Selector::parse(PAGINATION_CONTAINER_SELECTOR)
        .map_err(|e| format!("invalid pagination selector: {:?}", e))?;

    let mut anchors = Vec::new();
    for container in document.select(&container_selector) {
        anchors.extend(container.select(anchor_selector));
    }

    Ok(anchors)
}

fn anchor_selector() -> Result<Selector, String> {
    Selector::parse("a[href]").map_err(|e| format!("invalid anchor selector: {:?}", e))
}

/// Visible text of an anchor, falling back to its aria-label for icon links
fn anchor_label(anchor: &ElementRef<'_>) -> String {
    let text = collapse_whitespace(&anchor.text().collect::<String>());
    if !text.is_empty() {
        return text;
    }

    anchor
        .value()
        .attr("aria-label")
        .map(collapse_whitespace)
        .unwrap_or_default()
}

/// Checks a label against the next-marker vocabulary
///
/// Accepts an exact marker ("Next") or a combination of marker tokens such
/// as "Next »".
fn is_next_marker(label: &str) -> bool {
    let lowered = label.to_lowercase();
    if lowered.is_empty() {
        return false;
    }

    if NEXT_MARKERS.contains(&lowered.as_str()) {
        return true;
    }

    let tokens: Vec<&str> = lowered.split(' ').collect();
    tokens.iter().any(|t| *t != "page")
        && tokens
            .iter()
            .all(|t| *t == "page" || NEXT_MARKERS.contains(t))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
