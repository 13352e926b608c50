use crate::catalog::DEFAULT_MAX_FILE_SIZE_BYTES;
use crate::url::DEFAULT_ITEM_PATH_PREFIX;
use serde::Deserialize;

/// Main configuration structure for Catalog-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub downloader: DownloaderConfig,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// First listing page of the catalog
    #[serde(rename = "listing-url")]
    pub listing_url: String,

    /// Path prefix of item detail pages
    #[serde(rename = "item-path-prefix", default = "default_item_path_prefix")]
    pub item_path_prefix: String,

    /// Minimum time between detail page fetches (seconds, <= 0 disables)
    #[serde(rename = "rate-limit-seconds", default = "default_rate_limit_seconds")]
    pub rate_limit_seconds: f64,

    /// Maximum number of items to persist in one run
    #[serde(rename = "max-items", default)]
    pub max_items: Option<usize>,

    /// Whether artwork images are downloaded
    #[serde(rename = "download-images", default = "default_true")]
    pub download_images: bool,

    /// Whether items already in the structured log are skipped
    #[serde(default)]
    pub resume: bool,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the JSON Lines structured log
    #[serde(rename = "log-path")]
    pub log_path: String,

    /// Path to the CSV report
    #[serde(rename = "report-path")]
    pub report_path: String,

    /// Directory downloaded images are written to
    #[serde(rename = "image-dir")]
    pub image_dir: String,
}

/// Image download configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DownloaderConfig {
    /// Attempts per image, including the first
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff between attempts (seconds), doubled per attempt
    #[serde(rename = "backoff-seconds", default = "default_backoff_seconds")]
    pub backoff_seconds: f64,

    /// Largest accepted image, unlimited when absent
    #[serde(
        rename = "max-file-size-bytes",
        default = "default_max_file_size_bytes"
    )]
    pub max_file_size_bytes: Option<u64>,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_seconds: default_backoff_seconds(),
            max_file_size_bytes: default_max_file_size_bytes(),
        }
    }
}

fn default_item_path_prefix() -> String {
    DEFAULT_ITEM_PATH_PREFIX.to_string()
}

fn default_rate_limit_seconds() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_seconds() -> f64 {
    0.5
}

fn default_max_file_size_bytes() -> Option<u64> {
    Some(DEFAULT_MAX_FILE_SIZE_BYTES)
}
