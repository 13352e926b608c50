//! JSON Lines structured log

use crate::output::traits::{OutputError, OutputResult, RecordSink};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Appends one JSON object per line to a file
///
/// The file and its parent directories are created on first write. Each
/// line goes to the file in a single unbuffered write, so a failed append
/// leaves nothing behind that a later append could flush into the log.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    file: Option<File>,
}

impl JsonlSink {
    /// Creates a sink writing to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    /// Returns the path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&mut self) -> OutputResult<&mut File> {
        if self.file.is_none() {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            self.file = Some(file);
        }
        self.file
            .as_mut()
            .ok_or_else(|| OutputError::Write(format!("{} is not open", self.path.display())))
    }
}

/// Writes `payload` and its newline as one complete line
///
/// Nothing is retained between calls: either the line was handed to
/// `writer` in full or the call failed.
fn write_line<W: Write>(writer: &mut W, payload: &serde_json::Value) -> OutputResult<()> {
    let mut line = serde_json::to_vec(payload)?;
    line.push(b'\n');
    writer.write_all(&line)?;
    writer.flush()?;
    Ok(())
}

impl RecordSink for JsonlSink {
    fn append(&mut self, payload: &serde_json::Value) -> OutputResult<()> {
        let file = self.file()?;
        let committed_len = file.metadata().ok().map(|m| m.len());

        if let Err(e) = write_line(file, payload) {
            // Cut off a partially written line so the log stays line-aligned
            if let Some(len) = committed_len {
                if let Err(truncate_err) = file.set_len(len) {
                    tracing::warn!(
                        "Could not roll back partial line in {}: {}",
                        self.path.display(),
                        truncate_err
                    );
                }
            }
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/data/items.jsonl");

        let mut sink = JsonlSink::new(&path);
        sink.append(&json!({"slug": "a", "source_url": "https://shop.example/product/a/"}))
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        let parsed: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(parsed["slug"], "a");
    }

    #[test]
    fn test_appends_to_existing_log() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("items.jsonl");
        std::fs::write(&path, "{\"slug\":\"old\"}\n").unwrap();

        let mut sink = JsonlSink::new(&path);
        sink.append(&json!({"slug": "b"})).unwrap();
        sink.append(&json!({"slug": "c"})).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let slugs: Vec<String> = content
            .lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["slug"].to_string())
            .collect();
        assert_eq!(slugs, vec!["\"old\"", "\"b\"", "\"c\""]);
    }

    /// Rejects the first write, then records everything it is given
    struct RejectFirstWrite {
        rejected: bool,
        written: Vec<u8>,
    }

    impl Write for RejectFirstWrite {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.rejected {
                self.rejected = true;
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_line_never_reaches_later_writes() {
        let mut writer = RejectFirstWrite {
            rejected: false,
            written: Vec::new(),
        };

        assert!(write_line(&mut writer, &json!({"slug": "failed-item"})).is_err());
        write_line(&mut writer, &json!({"slug": "b"})).unwrap();

        let content = String::from_utf8(writer.written).unwrap();
        assert_eq!(content, "{\"slug\":\"b\"}\n");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_append_to_full_device_fails() {
        let mut sink = JsonlSink::new("/dev/full");
        let result = sink.append(&json!({"slug": "failed-item"}));
        assert!(matches!(result, Err(OutputError::Io(_))));
    }
}
