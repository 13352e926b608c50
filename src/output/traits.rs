//! Writer traits and run summary types
//!
//! This module defines the interfaces of the archival writers and the
//! summary reported at the end of a run.

use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Append-only structured log of successfully processed items
///
/// Every call appends exactly one payload; existing content is never
/// rewritten.
pub trait RecordSink: Send {
    /// Appends one record payload
    ///
    /// # Arguments
    ///
    /// * `payload` - JSON object describing the record
    fn append(&mut self, payload: &serde_json::Value) -> OutputResult<()>;
}

/// Deduplicating tabular report
pub trait ReportWriter<R>: Send {
    /// Adds a row for `record` unless an equivalent row already exists
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - A row was written
    /// * `Ok(false)` - The record was already present
    /// * `Err(OutputError)` - The report could not be read or written
    fn append(&mut self, record: &R) -> OutputResult<bool>;
}

/// Summary statistics for a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Items persisted this run
    pub processed: u64,

    /// Items skipped because they were already processed
    pub skipped: u64,

    /// Items that failed at some stage
    pub failed: u64,

    /// Failure counts per stage name
    pub errors_by_stage: BTreeMap<String, u64>,
}

impl RunSummary {
    /// Creates a new empty summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one failure at `stage`
    pub fn record_error(&mut self, stage: &str) {
        self.failed += 1;
        *self.errors_by_stage.entry(stage.to_string()).or_insert(0) += 1;
    }

    /// Items that were attempted (persisted or failed)
    pub fn attempted(&self) -> u64 {
        self.processed + self.failed
    }

    /// Returns the success rate of attempted items as a percentage
    pub fn success_rate(&self) -> f64 {
        let attempted = self.attempted();
        if attempted == 0 {
            return 0.0;
        }
        (self.processed as f64 / attempted as f64) * 100.0
    }
}
