//! Artwork image downloads
//!
//! Fetches the primary image of an artwork and stores it as
//! `<image-dir>/<slug>.<ext>`:
//! - Transport errors and 5xx responses are retried with exponential backoff
//! - The content type must be one of the allowed image types
//! - Empty and oversized bodies are rejected without retrying

use crate::catalog::artwork::Artwork;
use crate::catalog::traits::{AssetDownloader, DownloadError};
use crate::config::DownloaderConfig;
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Image types accepted for artwork imagery, with their file extensions
const ALLOWED_CONTENT_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

/// Default cap on image size: 15 MiB
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 15 * 1024 * 1024;

/// Outcome of a single attempt
enum AttemptError {
    /// Worth another try after backing off
    Retryable(String),
    /// Retrying would not help
    Fatal(DownloadError),
}

/// Downloads artwork images over HTTP
#[derive(Debug, Clone)]
pub struct ImageDownloader {
    client: Client,
    output_dir: PathBuf,
    max_retries: u32,
    backoff: Duration,
    max_file_size_bytes: Option<u64>,
}

impl ImageDownloader {
    /// Creates a downloader writing into `output_dir` with default limits
    pub fn new(client: Client, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            output_dir: output_dir.into(),
            max_retries: 3,
            backoff: Duration::from_millis(500),
            max_file_size_bytes: Some(DEFAULT_MAX_FILE_SIZE_BYTES),
        }
    }

    /// Creates a downloader from the `[downloader]` configuration section
    pub fn from_config(
        client: Client,
        output_dir: impl Into<PathBuf>,
        config: &DownloaderConfig,
    ) -> Self {
        Self::new(client, output_dir)
            .with_max_retries(config.max_retries)
            .with_backoff(
                Duration::try_from_secs_f64(config.backoff_seconds).unwrap_or(Duration::ZERO),
            )
            .with_max_file_size(config.max_file_size_bytes)
    }

    /// Sets the number of attempts, at least one
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Sets the base backoff; attempt `n` waits `backoff * 2^(n-1)` before retrying
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the size cap, `None` for unlimited
    pub fn with_max_file_size(mut self, limit: Option<u64>) -> Self {
        self.max_file_size_bytes = limit;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Backoff before the attempt following `attempt`
    fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }

    async fn attempt(&self, url: &str) -> Result<(&'static str, Vec<u8>), AttemptError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AttemptError::Retryable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(AttemptError::Retryable(format!("HTTP {}", status.as_u16())));
        }
        if !status.is_success() {
            return Err(AttemptError::Fatal(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or_default().trim().to_lowercase())
            .ok_or(AttemptError::Fatal(DownloadError::MissingContentType))?;

        let extension = ALLOWED_CONTENT_TYPES
            .iter()
            .find(|(allowed, _)| *allowed == content_type)
            .map(|(_, ext)| *ext)
            .ok_or_else(|| AttemptError::Fatal(DownloadError::ContentType(content_type.clone())))?;

        if let (Some(limit), Some(length)) = (self.max_file_size_bytes, response.content_length()) {
            if length > limit {
                return Err(AttemptError::Fatal(DownloadError::TooLarge { limit }));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AttemptError::Retryable(e.to_string()))?;

        if bytes.is_empty() {
            return Err(AttemptError::Fatal(DownloadError::Empty));
        }
        if let Some(limit) = self.max_file_size_bytes {
            if bytes.len() as u64 > limit {
                return Err(AttemptError::Fatal(DownloadError::TooLarge { limit }));
            }
        }

        Ok((extension, bytes.to_vec()))
    }
}

#[async_trait]
impl AssetDownloader<Artwork> for ImageDownloader {
    async fn download(&self, mut record: Artwork) -> Result<Artwork, DownloadError> {
        let Some(image_url) = record.image_url.clone() else {
            return Ok(record);
        };

        let mut attempt = 1;
        let (extension, bytes) = loop {
            match self.attempt(&image_url).await {
                Ok(downloaded) => break downloaded,
                Err(AttemptError::Fatal(e)) => return Err(e),
                Err(AttemptError::Retryable(message)) => {
                    if attempt >= self.max_retries {
                        return Err(DownloadError::Exhausted {
                            url: image_url,
                            attempts: attempt,
                            message,
                        });
                    }

                    let wait = self.backoff_for(attempt);
                    tracing::warn!(
                        "Image download attempt {} for {} failed ({}), retrying in {:?}",
                        attempt,
                        image_url,
                        message,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
            }
        };

        let slug = if record.slug.is_empty() {
            "artwork"
        } else {
            record.slug.as_str()
        };
        let target = self.output_dir.join(format!("{}.{}", slug, extension));

        tokio::fs::create_dir_all(&self.output_dir).await?;
        tokio::fs::write(&target, &bytes).await?;

        tracing::debug!("Saved {} ({} bytes)", target.display(), bytes.len());

        record.image_path = Some(target.to_string_lossy().into_owned());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn artwork_with_image(image_url: Option<String>) -> Artwork {
        let mut artwork = Artwork::new("Dune", "https://shop.example/product/dune/");
        artwork.image_url = image_url;
        artwork.validate("/product/").unwrap()
    }

    fn downloader(dir: &TempDir) -> ImageDownloader {
        ImageDownloader::new(Client::new(), dir.path()).with_backoff(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_no_image_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let artwork = artwork_with_image(None);

        let result = downloader(&dir).download(artwork.clone()).await.unwrap();
        assert_eq!(result, artwork);
    }

    #[tokio::test]
    async fn test_download_writes_slug_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dune.png"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![1u8, 2, 3], "image/png"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let artwork = artwork_with_image(Some(format!("{}/dune.png", server.uri())));

        let result = downloader(&dir).download(artwork).await.unwrap();
        let expected = dir.path().join("dune.png");
        assert_eq!(result.image_path.as_deref(), Some(expected.to_str().unwrap()));
        assert_eq!(std::fs::read(expected).unwrap(), vec![1u8, 2, 3]);
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dune.jpg"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/dune.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![9u8; 16], "image/jpeg"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let artwork = artwork_with_image(Some(format!("{}/dune.jpg", server.uri())));

        let result = downloader(&dir).download(artwork).await.unwrap();
        assert!(result.image_path.unwrap().ends_with("dune.jpg"));
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let artwork = artwork_with_image(Some(format!("{}/dune.jpg", server.uri())));

        let error = downloader(&dir).download(artwork).await.unwrap_err();
        assert!(matches!(error, DownloadError::Exhausted { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_disallowed_content_type_fails_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let artwork = artwork_with_image(Some(format!("{}/dune.jpg", server.uri())));

        let error = downloader(&dir).download(artwork).await.unwrap_err();
        assert!(matches!(error, DownloadError::ContentType(ref t) if t == "text/html"));
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 64], "image/gif"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let artwork = artwork_with_image(Some(format!("{}/dune.gif", server.uri())));

        let error = downloader(&dir)
            .with_max_file_size(Some(10))
            .download(artwork)
            .await
            .unwrap_err();
        assert!(matches!(error, DownloadError::TooLarge { limit: 10 }));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let artwork = artwork_with_image(Some(format!("{}/missing.jpg", server.uri())));

        let error = downloader(&dir).download(artwork).await.unwrap_err();
        assert!(matches!(error, DownloadError::Status { status: 404, .. }));
    }

    #[test]
    fn test_backoff_doubles() {
        let downloader =
            ImageDownloader::new(Client::new(), "out").with_backoff(Duration::from_millis(500));
        assert_eq!(downloader.backoff_for(1), Duration::from_millis(500));
        assert_eq!(downloader.backoff_for(2), Duration::from_secs(1));
        assert_eq!(downloader.backoff_for(3), Duration::from_secs(2));
    }
}
