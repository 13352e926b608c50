use crate::catalog::traits::{CatalogRecord, ExtractError};
use crate::url::item_identifier_from_str;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// One artwork detail page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artwork {
    /// Artwork title displayed on the detail page
    pub title: String,

    /// Narrative description, paragraphs joined
    pub description: Option<String>,

    /// Listed price in GBP without currency symbol or separators, e.g. "1250"
    pub price_gbp: Option<String>,

    /// Raw size text such as "46 x 46 x 2cm (unframed)"
    pub size: Option<String>,

    pub medium: Option<String>,

    pub materials_used: Option<String>,

    /// Whether the artwork is sold or otherwise unavailable
    pub sold: bool,

    /// Primary image URL
    pub image_url: Option<String>,

    /// Local path of the downloaded image, once fetched
    pub image_path: Option<String>,

    /// Canonical URL of the detail page
    pub source_url: String,

    /// When the page was scraped
    pub scraped_at: DateTime<Utc>,

    /// Identifier derived from the source URL
    pub slug: String,
}

impl Artwork {
    /// Creates an unvalidated artwork with every optional field empty
    pub fn new(title: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            price_gbp: None,
            size: None,
            medium: None,
            materials_used: None,
            sold: false,
            image_url: None,
            image_path: None,
            source_url: source_url.into(),
            scraped_at: Utc::now(),
            slug: String::new(),
        }
    }

    /// Cleans and validates the record
    ///
    /// - the title is trimmed and must not be empty
    /// - blank optional text collapses to `None`
    /// - the source URL must be http(s) and contain `<item_prefix><slug>`
    /// - the slug is derived from the source URL when not set
    /// - prices like "£1,250" are normalized to "1250" and must be numeric
    /// - the image URL, if any, must be http(s)
    pub fn validate(mut self, item_prefix: &str) -> Result<Self, ExtractError> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err(ExtractError::Validation("title must not be empty".to_string()));
        }

        self.description = clean_optional(self.description.take());
        self.size = clean_optional(self.size.take());
        self.medium = clean_optional(self.medium.take());
        self.materials_used = clean_optional(self.materials_used.take());
        self.image_path = clean_optional(self.image_path.take());
        self.image_url = clean_optional(self.image_url.take());

        self.source_url = self.source_url.trim().to_string();
        if !is_http_url(&self.source_url) {
            return Err(ExtractError::Validation(format!(
                "source_url '{}' is not an http(s) URL",
                self.source_url
            )));
        }

        if self.slug.trim().is_empty() {
            self.slug = item_identifier_from_str(&self.source_url, item_prefix).ok_or_else(|| {
                ExtractError::Validation(format!(
                    "source_url '{}' does not contain a {}<slug>/ path",
                    self.source_url, item_prefix
                ))
            })?;
        } else {
            self.slug = self.slug.trim().to_string();
        }

        self.price_gbp = match self.price_gbp.take() {
            Some(raw) => normalize_price(&raw)?,
            None => None,
        };

        if let Some(image_url) = &self.image_url {
            if !is_http_url(image_url) {
                return Err(ExtractError::Validation(format!(
                    "image_url '{}' is not an http(s) URL",
                    image_url
                )));
            }
        }

        Ok(self)
    }

    /// Human-readable availability used in reports
    pub fn status_label(&self) -> &'static str {
        if self.sold {
            "sold"
        } else {
            "for sale"
        }
    }

    /// Price formatted with the currency symbol
    pub fn formatted_price(&self) -> Option<String> {
        self.price_gbp.as_ref().map(|p| format!("£{}", p))
    }
}

impl CatalogRecord for Artwork {
    fn identifier(&self) -> &str {
        &self.slug
    }

    fn source_url(&self) -> &str {
        &self.source_url
    }
}

/// Normalizes a GBP price such as "£1,250.00"
fn normalize_price(raw: &str) -> Result<Option<String>, ExtractError> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '£' && *c != ',' && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return Ok(None);
    }

    let mut parts = cleaned.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next();

    let digits_only = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if !digits_only(whole) || fraction.is_some_and(|f| !digits_only(f)) {
        return Err(ExtractError::Validation(format!(
            "price_gbp must be a valid decimal value, got '{}'",
            raw
        )));
    }

    Ok(Some(cleaned))
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn is_http_url(value: &str) -> bool {
    Url::parse(value)
        .map(|u| (u.scheme() == "http" || u.scheme() == "https") && u.host_str().is_some())
        .unwrap_or(false)
}
