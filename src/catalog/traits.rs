//! Collaborator traits for item records
//!
//! The crawl core never looks inside a record beyond what [`CatalogRecord`]
//! exposes. Extraction and asset downloading are pluggable behind
//! [`FieldExtractor`] and [`AssetDownloader`].

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use url::Url;

/// Errors raised while turning markup into a record
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Could not locate {0} in page markup")]
    MissingField(&'static str),

    #[error("Invalid record: {0}")]
    Validation(String),

    #[error("Invalid selector or pattern: {0}")]
    Pattern(String),
}

/// Errors raised while downloading a record's assets
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Failed to download {url} after {attempts} attempts: {message}")]
    Exhausted {
        url: String,
        attempts: u32,
        message: String,
    },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Content type '{0}' is not allowed")]
    ContentType(String),

    #[error("Response did not include a Content-Type header")]
    MissingContentType,

    #[error("Downloaded asset is empty")]
    Empty,

    #[error("Downloaded asset exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A structured record describing one catalog item
///
/// Records are serialized as-is into the structured log, so they must
/// serialize to a JSON object.
pub trait CatalogRecord: Serialize + Send + Sync + 'static {
    /// Stable identifier of the item (the slug of its URL)
    fn identifier(&self) -> &str;

    /// Canonical URL of the item detail page
    fn source_url(&self) -> &str;

    /// Serializes the record into a writer-ready payload
    fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Turns detail page markup into a record
pub trait FieldExtractor<R: CatalogRecord>: Send + Sync {
    /// Extracts and validates a record from `html` served at `source_url`
    fn extract(&self, html: &str, source_url: &Url) -> Result<R, ExtractError>;
}

/// Downloads the remote assets a record refers to
#[async_trait]
pub trait AssetDownloader<R: CatalogRecord>: Send + Sync {
    /// Returns the record updated with local asset paths
    async fn download(&self, record: R) -> Result<R, DownloadError>;
}
