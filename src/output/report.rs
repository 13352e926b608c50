//! CSV artwork report
//!
//! One row per artwork. Rows whose slug or title already appear in the
//! report are skipped, comparing case-insensitively, so re-running a
//! harvest never duplicates rows.

use crate::catalog::Artwork;
use crate::output::traits::{OutputResult, ReportWriter};
use crate::url::item_identifier_from_str;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Report column headers, in order
pub const REPORT_COLUMNS: [&str; 9] = [
    "image",
    "title",
    "size",
    "medium",
    "materials used",
    "price",
    "description",
    "status",
    "link",
];

const TITLE_COLUMN: usize = 1;
const LINK_COLUMN: usize = 8;

/// Identifiers already present in the report
#[derive(Debug, Default)]
struct ExistingRows {
    titles: HashSet<String>,
    slugs: HashSet<String>,
}

impl ExistingRows {
    fn contains(&self, artwork: &Artwork) -> bool {
        self.slugs.contains(&artwork.slug.to_lowercase())
            || self.titles.contains(&artwork.title.to_lowercase())
    }

    fn insert(&mut self, artwork: &Artwork) {
        self.slugs.insert(artwork.slug.to_lowercase());
        self.titles.insert(artwork.title.to_lowercase());
    }
}

/// Deduplicating CSV report of artworks
#[derive(Debug)]
pub struct CsvReport {
    path: PathBuf,
    item_prefix: String,
    existing: Option<ExistingRows>,
}

impl CsvReport {
    /// Creates a report writing to `path`
    ///
    /// Existing rows are read on the first append.
    pub fn new(path: impl Into<PathBuf>, item_prefix: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            item_prefix: item_prefix.into(),
            existing: None,
        }
    }

    /// Returns the path of the report file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the titles and slugs of the rows already in the report
    fn load_existing(&self) -> OutputResult<ExistingRows> {
        let mut existing = ExistingRows::default();
        if !self.path.exists() {
            return Ok(existing);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;

        for result in reader.records() {
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!("Skipping unreadable row in {}: {}", self.path.display(), e);
                    continue;
                }
            };

            let title = record.get(TITLE_COLUMN).unwrap_or("").trim();
            if !title.is_empty() {
                existing.titles.insert(title.to_lowercase());
            }

            let link = record.get(LINK_COLUMN).unwrap_or("").trim();
            if let Some(slug) = slug_from_link(link, &self.item_prefix) {
                existing.slugs.insert(slug.to_lowercase());
            }
        }

        Ok(existing)
    }

    fn write_row(&self, artwork: &Artwork) -> OutputResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let is_new = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if is_new {
            writer.write_record(REPORT_COLUMNS)?;
        }

        let price = artwork.formatted_price().unwrap_or_default();
        writer.write_record([
            artwork.image_path.as_deref().unwrap_or(""),
            artwork.title.as_str(),
            artwork.size.as_deref().unwrap_or(""),
            artwork.medium.as_deref().unwrap_or(""),
            artwork.materials_used.as_deref().unwrap_or(""),
            price.as_str(),
            artwork.description.as_deref().unwrap_or(""),
            artwork.status_label(),
            artwork.source_url.as_str(),
        ])?;
        writer.flush()?;

        Ok(())
    }
}

impl ReportWriter<Artwork> for CsvReport {
    fn append(&mut self, artwork: &Artwork) -> OutputResult<bool> {
        if self.existing.is_none() {
            self.existing = Some(self.load_existing()?);
        }

        if self.existing.as_ref().is_some_and(|rows| rows.contains(artwork)) {
            tracing::debug!("Report already lists '{}', skipping row", artwork.title);
            return Ok(false);
        }

        self.write_row(artwork)?;
        self.existing.get_or_insert_with(ExistingRows::default).insert(artwork);

        Ok(true)
    }
}

/// Derives the slug of a report link, falling back to its last path segment
fn slug_from_link(link: &str, item_prefix: &str) -> Option<String> {
    if link.is_empty() {
        return None;
    }

    item_identifier_from_str(link, item_prefix).or_else(|| {
        url::Url::parse(link).ok().and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.rfind(|s| !s.is_empty()).map(str::to_string))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PREFIX: &str = "/product/";

    fn artwork(slug: &str, title: &str) -> Artwork {
        let mut artwork = Artwork::new(title, format!("https://shop.example/product/{}/", slug));
        artwork.price_gbp = Some("475".to_string());
        artwork.size = Some("30 x 40 cm".to_string());
        artwork.validate(PREFIX).unwrap()
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_creates_report_with_headers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/report.csv");
        let mut report = CsvReport::new(&path, PREFIX);

        assert!(report.append(&artwork("dune", "Dune")).unwrap());

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], REPORT_COLUMNS.map(str::to_string).to_vec());
        assert_eq!(rows[1][1], "Dune");
        assert_eq!(rows[1][2], "30 x 40 cm");
        assert_eq!(rows[1][5], "£475");
        assert_eq!(rows[1][7], "for sale");
        assert_eq!(rows[1][8], "https://shop.example/product/dune/");
    }

    #[test]
    fn test_skips_duplicate_slug_and_title() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.csv");
        let mut report = CsvReport::new(&path, PREFIX);

        assert!(report.append(&artwork("dune", "Dune")).unwrap());
        assert!(!report.append(&artwork("dune", "Another Title")).unwrap());
        assert!(!report.append(&artwork("dune-two", "DUNE")).unwrap());
        assert!(report.append(&artwork("harbour", "Harbour")).unwrap());

        assert_eq!(read_rows(&path).len(), 3);
    }

    #[test]
    fn test_reads_rows_from_previous_runs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.csv");

        CsvReport::new(&path, PREFIX)
            .append(&artwork("dune", "Dune"))
            .unwrap();

        let mut second_run = CsvReport::new(&path, PREFIX);
        assert!(!second_run.append(&artwork("dune", "Dune")).unwrap());
        assert!(second_run.append(&artwork("harbour", "Harbour")).unwrap());

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], "image");
    }

    #[test]
    fn test_slug_from_link() {
        assert_eq!(
            slug_from_link("https://shop.example/product/dune/", PREFIX).as_deref(),
            Some("dune")
        );
        assert_eq!(
            slug_from_link("https://shop.example/art/harbour", PREFIX).as_deref(),
            Some("harbour")
        );
        assert_eq!(slug_from_link("", PREFIX), None);
    }
}
