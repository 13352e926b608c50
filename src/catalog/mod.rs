//! Catalog records and their collaborators
//!
//! This module handles:
//! - The record interface the crawl core routes ([`CatalogRecord`])
//! - The artwork record shipped with the crate
//! - Detail page extraction and image downloads for artworks

mod artwork;
mod downloader;
mod extractor;
mod traits;

pub use artwork::Artwork;
pub use downloader::{ImageDownloader, DEFAULT_MAX_FILE_SIZE_BYTES};
pub use extractor::ArtworkExtractor;
pub use traits::{AssetDownloader, CatalogRecord, DownloadError, ExtractError, FieldExtractor};
