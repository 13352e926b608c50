//! Pipeline coordinator - per-item harvest orchestration
//!
//! This module contains the main harvest loop. It pulls item URLs from an
//! [`ItemSource`] one at a time and drives each through:
//! - Dedup check against the ledger
//! - Rate-limited fetch
//! - Field extraction and optional asset download
//! - Normalization, structured log append and report update
//!
//! A failure at any stage is recorded against the item and the loop moves on.
//! Only a failure of the item source itself aborts the run.

use crate::catalog::{
    ArtworkExtractor, AssetDownloader, CatalogRecord, FieldExtractor, ImageDownloader,
};
use crate::config::Config;
use crate::crawler::fetcher::{HttpFetcher, PageFetcher};
use crate::crawler::rate_limiter::RateLimiter;
use crate::crawler::walker::{ItemSource, PaginationWalker};
use crate::output::{load_processed_identifiers, CsvReport, JsonlSink, RecordSink, ReportWriter};
use crate::state::DedupLedger;
use crate::url::{parse_listing_url, require_item_identifier};
use crate::{Artwork, HarvestError};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Pipeline stage at which an item failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Fetch,
    Extract,
    Download,
    Normalize,
    Persist,
    Spreadsheet,
}

impl Stage {
    /// Returns the stage name used in logs and summaries
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Extract => "extract",
            Stage::Download => "download",
            Stage::Normalize => "normalize",
            Stage::Persist => "persist",
            Stage::Spreadsheet => "spreadsheet",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A per-item failure, recorded without aborting the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingError {
    pub stage: Stage,
    pub url: String,
    pub message: String,
}

/// Outcome of a pipeline run
#[derive(Debug)]
pub struct RunResult<R> {
    /// Persisted records in processing order
    pub records: Vec<R>,

    /// Per-item failures in processing order
    pub errors: Vec<ProcessingError>,

    /// Items skipped because they were already processed
    pub skipped: usize,
}

impl<R> Default for RunResult<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            errors: Vec::new(),
            skipped: 0,
        }
    }
}

/// Settings shared by every item of a run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Path prefix identifying item detail pages
    pub item_prefix: String,

    /// Spacing between detail page fetches
    pub rate_limiter: RateLimiter,
}

/// Drives items from discovery to persistence
///
/// The ledger and the last request time are owned by the pipeline, so a run
/// needs no synchronization. Collaborators are trait objects and can be
/// swapped for tests.
pub struct Pipeline<R: CatalogRecord> {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Box<dyn FieldExtractor<R>>,
    downloader: Option<Box<dyn AssetDownloader<R>>>,
    sink: Box<dyn RecordSink>,
    report: Box<dyn ReportWriter<R>>,
    ledger: DedupLedger,
    options: PipelineOptions,
    last_request: Option<Instant>,
    cancel: CancellationToken,
}

impl<R: CatalogRecord> Pipeline<R> {
    /// Creates a pipeline without asset downloading and with an empty ledger
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: Box<dyn FieldExtractor<R>>,
        sink: Box<dyn RecordSink>,
        report: Box<dyn ReportWriter<R>>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            downloader: None,
            sink,
            report,
            ledger: DedupLedger::new(),
            options,
            last_request: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Enables asset downloading
    pub fn with_downloader(mut self, downloader: Box<dyn AssetDownloader<R>>) -> Self {
        self.downloader = Some(downloader);
        self
    }

    /// Replaces the ledger, e.g. with one preloaded from a previous run
    pub fn with_ledger(mut self, ledger: DedupLedger) -> Self {
        self.ledger = ledger;
        self
    }

    /// Observes `cancel` between items
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut DedupLedger {
        &mut self.ledger
    }

    /// Runs the pipeline over `source`
    ///
    /// # Arguments
    ///
    /// * `source` - Lazy sequence of item URLs
    /// * `max_items` - Stop after this many items were persisted
    ///
    /// # Returns
    ///
    /// * `Ok(RunResult)` - Persisted records, per-item errors and skip count
    /// * `Err(HarvestError)` - The item source failed, e.g. a listing page
    ///   could not be fetched
    pub async fn run<S>(
        &mut self,
        source: &mut S,
        max_items: Option<usize>,
    ) -> Result<RunResult<R>, HarvestError>
    where
        S: ItemSource + ?Sized,
    {
        let mut result = RunResult::default();
        let start_time = std::time::Instant::now();

        loop {
            if max_items.is_some_and(|max| result.records.len() >= max) {
                tracing::info!("Reached max items ({})", result.records.len());
                break;
            }

            if self.cancel.is_cancelled() {
                tracing::info!("Harvest cancelled, stopping before the next item");
                break;
            }

            let url = match source.next_item().await? {
                Some(url) => url,
                None => break,
            };

            let identifier = match require_item_identifier(&url, &self.options.item_prefix) {
                Ok(id) => id,
                Err(e) => {
                    record_error(&mut result, Stage::Extract, &url, e.to_string());
                    continue;
                }
            };

            if self.ledger.seen(&identifier) {
                tracing::debug!("Skipping {} (already processed)", url);
                result.skipped += 1;
                continue;
            }

            if let Some(record) = self.process_item(&url, &mut result).await {
                self.ledger.mark(&identifier);
                result.records.push(record);
                tracing::info!("Processed {} ({} total)", url, result.records.len());
            }
        }

        tracing::info!(
            "Harvest finished: {} processed, {} failed, {} skipped in {:?}",
            result.records.len(),
            result.errors.len(),
            result.skipped,
            start_time.elapsed()
        );

        Ok(result)
    }

    /// Processes a single item
    ///
    /// Returns the record if it was persisted; failures are recorded in
    /// `result`.
    async fn process_item(&mut self, url: &Url, result: &mut RunResult<R>) -> Option<R> {
        self.last_request = Some(self.options.rate_limiter.wait_turn(self.last_request).await);

        let html = match self.fetcher.fetch(url).await {
            Ok(html) => html,
            Err(e) => {
                record_error(result, Stage::Fetch, url, e.to_string());
                return None;
            }
        };

        let mut record = match self.extractor.extract(&html, url) {
            Ok(record) => record,
            Err(e) => {
                record_error(result, Stage::Extract, url, e.to_string());
                return None;
            }
        };

        if let Some(downloader) = &self.downloader {
            record = match downloader.download(record).await {
                Ok(record) => record,
                Err(e) => {
                    record_error(result, Stage::Download, url, e.to_string());
                    return None;
                }
            };
        }

        let payload = match normalize_payload(&record) {
            Ok(payload) => payload,
            Err(message) => {
                record_error(result, Stage::Normalize, url, message);
                return None;
            }
        };

        if let Err(e) = self.sink.append(&payload) {
            record_error(result, Stage::Persist, url, e.to_string());
            return None;
        }

        // The log is the durable record; a report failure does not undo it
        if let Err(e) = self.report.append(&record) {
            record_error(result, Stage::Spreadsheet, url, e.to_string());
        }

        Some(record)
    }
}

/// Serializes a record into a log payload carrying `slug` and `source_url`
fn normalize_payload<R: CatalogRecord>(record: &R) -> Result<serde_json::Value, String> {
    let mut payload = record.to_payload().map_err(|e| e.to_string())?;

    let object = payload
        .as_object_mut()
        .ok_or_else(|| "record did not serialize to a JSON object".to_string())?;

    object
        .entry("slug")
        .or_insert_with(|| serde_json::Value::String(record.identifier().to_string()));
    object
        .entry("source_url")
        .or_insert_with(|| serde_json::Value::String(record.source_url().to_string()));

    Ok(payload)
}

fn record_error<R>(result: &mut RunResult<R>, stage: Stage, url: &Url, message: String) {
    tracing::error!("[{}] {}: {}", stage, url, message);
    result.errors.push(ProcessingError {
        stage,
        url: url.to_string(),
        message,
    });
}

/// Per-run switches layered over the configuration
#[derive(Debug, Clone, Default)]
pub struct HarvestOptions {
    /// Skip items already present in the structured log
    pub resume: bool,

    /// Stop after this many persisted items
    pub max_items: Option<usize>,

    /// Download artwork images
    pub download_images: bool,

    /// Cancels the run between items
    pub cancel: CancellationToken,
}

impl HarvestOptions {
    /// Takes every switch from the configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            resume: config.crawler.resume,
            max_items: config.crawler.max_items,
            download_images: config.crawler.download_images,
            cancel: CancellationToken::new(),
        }
    }
}

/// Runs a complete artwork harvest
///
/// This is the main entry point for a harvest. It will:
/// 1. Build the HTTP client shared by the fetcher and image downloader
/// 2. Load previously processed identifiers when resuming
/// 3. Walk the listing pages lazily
/// 4. Process every new item through the pipeline
///
/// # Arguments
///
/// * `config` - The harvest configuration
/// * `options` - Per-run switches
///
/// # Returns
///
/// * `Ok(RunResult)` - Harvest finished, possibly with per-item errors
/// * `Err(HarvestError)` - Harvest aborted
///
/// # Example
///
/// ```no_run
/// use catalog_harvest::config::load_config;
/// use catalog_harvest::crawler::{run_harvest, HarvestOptions};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let options = HarvestOptions::from_config(&config);
/// let result = run_harvest(&config, options).await?;
/// println!("{} artworks", result.records.len());
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest(
    config: &Config,
    options: HarvestOptions,
) -> Result<RunResult<Artwork>, HarvestError> {
    let prefix = config.crawler.item_path_prefix.clone();
    let listing_url = parse_listing_url(&config.crawler.listing_url)?;

    let fetcher = HttpFetcher::from_config(&config.user_agent)?;
    let client = fetcher.client().clone();
    let fetcher: Arc<dyn PageFetcher> = Arc::new(fetcher);

    let extractor = ArtworkExtractor::new(prefix.clone())?;

    let mut ledger = DedupLedger::new();
    if options.resume {
        let prior = load_processed_identifiers(Path::new(&config.output.log_path), &prefix)?;
        tracing::info!("Resuming: {} items already processed", prior.len());
        ledger.load_prior(prior)?;
    }

    let pipeline_options = PipelineOptions {
        item_prefix: prefix.clone(),
        rate_limiter: RateLimiter::from_secs_f64(config.crawler.rate_limit_seconds),
    };

    let mut pipeline = Pipeline::new(
        Arc::clone(&fetcher),
        Box::new(extractor),
        Box::new(JsonlSink::new(&config.output.log_path)),
        Box::new(CsvReport::new(&config.output.report_path, prefix.clone())),
        pipeline_options,
    )
    .with_ledger(ledger)
    .with_cancellation(options.cancel.clone());

    if options.download_images {
        pipeline = pipeline.with_downloader(Box::new(ImageDownloader::from_config(
            client,
            &config.output.image_dir,
            &config.downloader,
        )));
    }

    let mut walker = PaginationWalker::new(fetcher, listing_url, prefix);
    let result = pipeline.run(&mut walker, options.max_items).await?;

    tracing::info!(
        "Walked {} listing pages, discovered {} items",
        walker.pages_walked(),
        walker.items_emitted()
    );

    Ok(result)
}
