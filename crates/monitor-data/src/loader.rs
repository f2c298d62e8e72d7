//! Tab-separated data file parsing.
//!
//! The device writes Latin-1 text, so bytes are decoded one-to-one into
//! characters rather than as UTF-8. Cells stay text; numeric coercion happens
//! in the consumers.

use std::path::Path;
use std::sync::Arc;

use monitor_core::error::{MonitorError, Result};
use monitor_core::models::{Record, RecordRow};
use monitor_core::time_utils::parse_time_of_day;
use tracing::{debug, info};

/// Anything that can turn a data file path into a parsed [`Record`].
///
/// Implemented by the plain [`RecordLoader`] and by caching wrappers.
pub trait RecordSource {
    fn load_record(&self, path: &Path) -> Result<Arc<Record>>;
}

/// Parser for one device's log files.
#[derive(Debug, Clone)]
pub struct RecordLoader {
    time_column: String,
}

impl RecordLoader {
    /// `time_column` is the header of the `HH:MM:SS` clock column.
    pub fn new(time_column: impl Into<String>) -> Self {
        Self {
            time_column: time_column.into(),
        }
    }

    /// Parse the file at `path`.
    ///
    /// Rows whose field count differs from the header are dropped. Fails only
    /// when the file cannot be read, has no header, or is not parseable as
    /// delimited text at all.
    pub fn load(&self, path: &Path) -> Result<Record> {
        info!("Loading data file: {}", path.display());

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|e| to_load_error(path, e))?;

        let mut records = reader.byte_records();
        let header = match records.next() {
            Some(rec) => rec.map_err(|e| to_load_error(path, e))?,
            None => return Err(MonitorError::EmptyFile(path.to_path_buf())),
        };
        let columns: Vec<String> = header.iter().map(decode_cell).collect();
        let time_column = columns.iter().position(|c| *c == self.time_column);

        let mut rows = Vec::new();
        let mut dropped = 0usize;
        for rec in records {
            let rec = rec.map_err(|e| to_load_error(path, e))?;
            if rec.len() != columns.len() {
                dropped += 1;
                continue;
            }
            let values: Vec<String> = rec.iter().map(decode_cell).collect();
            let time_of_day = time_column.and_then(|c| parse_time_of_day(&values[c]));
            rows.push(RecordRow {
                values,
                time_of_day,
            });
        }

        if dropped > 0 {
            debug!(
                "Dropped {} malformed rows from {}",
                dropped,
                path.display()
            );
        }
        info!(
            "Loaded {} rows, {} columns from {}",
            rows.len(),
            columns.len(),
            path.file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_default()
        );

        Ok(Record::new(columns, rows, time_column))
    }
}

impl RecordSource for RecordLoader {
    fn load_record(&self, path: &Path) -> Result<Arc<Record>> {
        self.load(path).map(Arc::new)
    }
}

/// Decode Latin-1 bytes, drop carriage returns and trim surrounding
/// whitespace.
fn decode_cell(bytes: &[u8]) -> String {
    let text: String = bytes
        .iter()
        .map(|&b| char::from(b))
        .filter(|&c| c != '\r')
        .collect();
    text.trim().to_string()
}

fn to_load_error(path: &Path, err: csv::Error) -> MonitorError {
    if err.is_io_error() {
        MonitorError::FileRead {
            path: path.to_path_buf(),
            source: std::io::Error::from(err),
        }
    } else {
        MonitorError::Parse {
            path: path.to_path_buf(),
            source: err,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn loader() -> RecordLoader {
        RecordLoader::new("heures")
    }

    #[test]
    fn test_load_basic_file() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "010124.txt",
            b"heures\tfull range\tstill\n10:00:00\t0.012\t0.8\n10:00:30\t0.013\t0.81\n",
        );
        let rec = loader().load(&path).unwrap();
        assert_eq!(rec.columns(), &["heures", "full range", "still"]);
        assert_eq!(rec.len(), 2);
        assert_eq!(rec.value(1, "still"), Some("0.81"));
        assert!(rec.has_time());
        assert!(rec.rows()[0].time_of_day.is_some());
    }

    #[test]
    fn test_headers_and_cells_trimmed_of_cr_and_spaces() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "010124.txt",
            b" heures \t still\r\n 10:00:00 \t 0.8 \r\n",
        );
        let rec = loader().load(&path).unwrap();
        assert_eq!(rec.columns(), &["heures", "still"]);
        assert_eq!(rec.value(0, "heures"), Some("10:00:00"));
        assert_eq!(rec.value(0, "still"), Some("0.8"));
    }

    #[test]
    fn test_rows_with_wrong_field_count_are_dropped() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "010124.txt",
            b"heures\tP1\tP2\n\
              10:00:00\t1\t2\n\
              10:00:30\t1\t2\textra\tmore\n\
              10:01:00\t1\n\
              10:01:30\t3\t4\n",
        );
        let rec = loader().load(&path).unwrap();
        assert_eq!(rec.len(), 2);
        assert_eq!(rec.value(1, "P1"), Some("3"));
    }

    #[test]
    fn test_latin1_bytes_preserved() {
        let dir = TempDir::new().unwrap();
        // 0xB0 is the degree sign, 0xE9 is e-acute in Latin-1; neither is valid UTF-8 alone.
        let path = write(
            &dir,
            "010124.txt",
            b"heures\tunit\tTemp\xe9rature\n10:00:00\t4\xb0K\t1.5\n",
        );
        let rec = loader().load(&path).unwrap();
        assert_eq!(rec.columns()[2], "Température");
        assert_eq!(rec.value(0, "unit"), Some("4°K"));
        assert_eq!(rec.value(0, "Température"), Some("1.5"));
    }

    #[test]
    fn test_unparseable_time_keeps_raw_text() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "010124.txt", b"heures\tstill\n25:99:00\t0.8\n");
        let rec = loader().load(&path).unwrap();
        assert_eq!(rec.len(), 1);
        assert!(rec.rows()[0].time_of_day.is_none());
        assert_eq!(rec.time_str(0), Some("25:99:00"));
    }

    #[test]
    fn test_file_without_time_column() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "010124.txt", b"P1\tP2\n1\t2\n");
        let rec = loader().load(&path).unwrap();
        assert!(!rec.has_time());
        assert_eq!(rec.time_str(0), None);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "010124.txt", b"heures\tP1\n\n10:00:00\t1\n\n");
        assert_eq!(loader().load(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "010124.txt", b"");
        assert!(matches!(
            loader().load(&path),
            Err(MonitorError::EmptyFile(_))
        ));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let err = loader().load(&dir.path().join("010124.txt")).unwrap_err();
        assert!(matches!(err, MonitorError::FileRead { .. }));
    }

    #[test]
    fn test_record_source_wraps_in_arc() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "010124.txt", b"heures\tP1\n10:00:00\t1\n");
        let rec = loader().load_record(&path).unwrap();
        assert_eq!(rec.len(), 1);
    }
}
