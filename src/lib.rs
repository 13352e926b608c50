//! Catalog-Harvest: a polite storefront catalog harvester
//!
//! This crate walks the paginated listing of a single storefront, discovers
//! item detail pages, and persists one structured record per item. Output is
//! append-only and deduplicated, so an interrupted harvest can be resumed.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Catalog-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A listing page could not be fetched or parsed. Aborts the walk.
    #[error("Listing page {url} failed: {message}")]
    Structural { url: String, message: String },

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Extractor error: {0}")]
    Extract(#[from] catalog::ExtractError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] state::LedgerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("URL is not an item link: {0}")]
    NotAnItem(String),
}

/// Result type alias for Catalog-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use catalog::{Artwork, CatalogRecord};
pub use config::Config;
pub use crawler::{PaginationWalker, Pipeline, ProcessingError, RunResult, Stage};
pub use state::DedupLedger;
pub use url::{item_identifier, normalize_item_link, normalize_navigation_link};
