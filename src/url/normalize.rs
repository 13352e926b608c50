use url::Url;

/// Item detail pages live under this path unless the config says otherwise
pub const DEFAULT_ITEM_PATH_PREFIX: &str = "/product/";

/// Schemes that never lead to a navigable page
const NON_NAVIGABLE_SCHEMES: &[&str] = &["javascript", "mailto", "tel"];

/// List of tracking query parameters ignored when comparing listing pages
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
    "ref",
    "source",
];

/// Normalizes an anchor href into the canonical URL of an item detail page
///
/// # Normalization Steps
///
/// 1. Reject missing, empty and `#`-only hrefs
/// 2. Reject `javascript:`, `mailto:` and `tel:` (scheme compared case-insensitively)
/// 3. Resolve the href against `base_url`
/// 4. Reject results without a host
/// 5. Require the path to start with `prefix`; the next segment is the identifier
///    and must be non-empty with no further `/`
/// 6. Rebuild as `prefix + identifier + "/"`, dropping query and fragment
///
/// # Examples
///
/// ```
/// use catalog_harvest::url::normalize_item_link;
/// use url::Url;
///
/// let base = Url::parse("https://shop.example/artist/sort-newest/").unwrap();
/// let url = normalize_item_link(&base, Some("/product/blue-bay?ref=grid"), "/product/").unwrap();
/// assert_eq!(url.as_str(), "https://shop.example/product/blue-bay/");
/// ```
pub fn normalize_item_link(base_url: &Url, raw_href: Option<&str>, prefix: &str) -> Option<Url> {
    let absolute = resolve_href(base_url, raw_href?)?;

    if absolute.host_str().is_none() {
        return None;
    }

    let identifier = identifier_from_path(absolute.path(), prefix)?;

    let mut canonical = absolute;
    canonical.set_path(&format!("{}{}/", prefix, identifier));
    canonical.set_query(None);
    canonical.set_fragment(None);
    Some(canonical)
}

/// Normalizes a pagination anchor href
///
/// Looser than [`normalize_item_link`]: any path is accepted, the query is
/// preserved and only the fragment is stripped. Only `http` and `https`
/// targets are returned.
pub fn normalize_navigation_link(base_url: &Url, raw_href: Option<&str>) -> Option<Url> {
    let mut absolute = resolve_href(base_url, raw_href?)?;

    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    if absolute.host_str().is_none() {
        return None;
    }

    absolute.set_fragment(None);
    Some(absolute)
}

/// Derives the item identifier from any URL whose path contains `prefix`
///
/// Unlike [`normalize_item_link`] the prefix may appear anywhere in the path,
/// which lets records written under a localized path still resolve.
pub fn item_identifier(url: &Url, prefix: &str) -> Option<String> {
    let path = url.path();
    let start = path.find(prefix)?;
    identifier_from_path(&path[start..], prefix)
}

/// Same as [`item_identifier`] for an unparsed URL string
pub fn item_identifier_from_str(url: &str, prefix: &str) -> Option<String> {
    Url::parse(url.trim())
        .ok()
        .and_then(|parsed| item_identifier(&parsed, prefix))
}

/// Computes the key used to detect revisited listing pages
///
/// The key keeps scheme, host, port, path and query so that `?page=2` style
/// pagination stays distinguishable, but ignores the fragment, a trailing
/// slash, tracking parameters and query parameter order.
pub fn pagination_key(url: &Url) -> String {
    let mut key = format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default());
    if let Some(port) = url.port() {
        key.push_str(&format!(":{}", port));
    }

    let path = url.path();
    let trimmed = path.trim_end_matches('/');
    key.push_str(if trimmed.is_empty() { "/" } else { trimmed });

    if url.query().is_some() {
        let params = filter_and_sort_query_params(url);
        if !params.is_empty() {
            let query_string = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            key.push('?');
            key.push_str(&query_string);
        }
    }

    key
}

/// Applies the shared href rejection rules and resolves against the base
fn resolve_href(base_url: &Url, raw_href: &str) -> Option<Url> {
    let href = raw_href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if let Some((scheme, _)) = href.split_once(':') {
        let scheme = scheme.trim().to_ascii_lowercase();
        if NON_NAVIGABLE_SCHEMES.contains(&scheme.as_str()) {
            return None;
        }
    }

    base_url.join(href).ok()
}

/// Returns the identifier segment that follows `prefix` in `path`
fn identifier_from_path(path: &str, prefix: &str) -> Option<String> {
    let rest = path.strip_prefix(prefix)?;
    let identifier = rest.trim_matches('/');

    if identifier.is_empty() || identifier.contains('/') {
        return None;
    }

    Some(identifier.to_string())
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort();
    params
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
