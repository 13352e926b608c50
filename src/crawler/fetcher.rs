//! Page fetching
//!
//! This module defines the single interface the crawl core uses to obtain
//! page markup, plus the default HTTP implementation:
//! - Building HTTP clients with an identifying user agent string
//! - GET requests with bounded redirects
//! - Error classification

use crate::config::UserAgentConfig;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors returned by a page fetcher
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },
}

/// Obtains the markup of a page
///
/// Implementations own their navigation waits and politeness delays; the
/// crawl core only sees markup or an error.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url` and returns its markup
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

/// Formats the identifying user agent string
///
/// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use catalog_harvest::config::UserAgentConfig;
/// use catalog_harvest::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "CatalogHarvest".to_string(),
///     crawler_version: "0.1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "ops@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages over plain HTTP
///
/// The markup is returned as served; no script is executed.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher around an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a fetcher with a client built from the user agent configuration
    pub fn from_config(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config)?))
    }

    /// Returns the underlying client so other collaborators can share it
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        tracing::debug!("Fetching {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| classify_error(url, e))
    }
}

/// Maps a reqwest error onto the fetch error taxonomy
fn classify_error(url: &Url, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}
