//! Resume loader
//!
//! Rebuilds the set of already-persisted item identifiers from the
//! structured log of earlier runs.

use crate::output::traits::OutputResult;
use crate::url::item_identifier_from_str;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Loads the identifiers of items already present in a JSON Lines log
///
/// For every line the identifier is taken from the `slug` field, then the
/// `identifier` field, and is otherwise derived from `source_url`. Blank
/// and malformed lines are skipped with a warning.
///
/// # Arguments
///
/// * `path` - Path of the structured log
/// * `item_prefix` - Path prefix used to derive identifiers from URLs
///
/// # Returns
///
/// * `Ok(HashSet<String>)` - Identifiers found, empty if the file does not exist
/// * `Err(OutputError)` - The file exists but could not be read
pub fn load_processed_identifiers(
    path: &Path,
    item_prefix: &str,
) -> OutputResult<HashSet<String>> {
    let mut identifiers = HashSet::new();

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("No previous log at {}, starting fresh", path.display());
            return Ok(identifiers);
        }
        Err(e) => return Err(e.into()),
    };

    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let value: serde_json::Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(
                    "Skipping malformed line {} in {}: {}",
                    index + 1,
                    path.display(),
                    e
                );
                continue;
            }
        };

        match identifier_from_entry(&value, item_prefix) {
            Some(id) => {
                identifiers.insert(id);
            }
            None => tracing::warn!(
                "Line {} in {} has no usable identifier",
                index + 1,
                path.display()
            ),
        }
    }

    tracing::info!(
        "Loaded {} processed identifiers from {}",
        identifiers.len(),
        path.display()
    );

    Ok(identifiers)
}

fn identifier_from_entry(value: &serde_json::Value, item_prefix: &str) -> Option<String> {
    let object = value.as_object()?;

    for key in ["slug", "identifier"] {
        if let Some(id) = object.get(key).and_then(|v| v.as_str()) {
            let id = id.trim();
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }
    }

    object
        .get("source_url")
        .and_then(|v| v.as_str())
        .and_then(|url| item_identifier_from_str(url, item_prefix))
}
