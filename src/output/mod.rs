//! Output module for persisting harvested records
//!
//! This module handles:
//! - Appending records to the JSON Lines structured log
//! - Maintaining the deduplicated CSV report
//! - Reading earlier logs back for resumed runs
//! - Summarizing a run for the console

mod jsonl;
mod report;
mod resume;
mod traits;

pub use jsonl::JsonlSink;
pub use report::{CsvReport, REPORT_COLUMNS};
pub use resume::load_processed_identifiers;
pub use traits::{OutputError, OutputResult, RecordSink, ReportWriter, RunSummary};

use crate::catalog::CatalogRecord;
use crate::crawler::RunResult;

/// Builds the summary of a finished run
pub fn summarize<R: CatalogRecord>(result: &RunResult<R>) -> RunSummary {
    let mut summary = RunSummary::new();
    summary.processed = result.records.len() as u64;
    summary.skipped = result.skipped as u64;
    for error in &result.errors {
        summary.record_error(error.stage.as_str());
    }
    summary
}

/// Renders a summary and its errors as console lines
///
/// The first line reads `Processed N item(s); M error(s)`, followed by one
/// `[stage] url: message` line per error.
pub fn render_summary<R: CatalogRecord>(result: &RunResult<R>) -> Vec<String> {
    let summary = summarize(result);

    let mut lines = vec![format!(
        "Processed {} item(s); {} error(s)",
        summary.processed, summary.failed
    )];

    if summary.skipped > 0 {
        lines.push(format!("Skipped {} already processed item(s)", summary.skipped));
    }

    for error in &result.errors {
        lines.push(format!("[{}] {}: {}", error.stage, error.url, error.message));
    }

    lines
}
