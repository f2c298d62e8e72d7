//! Concatenation of per-file records into one ordered dataset.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use monitor_core::models::{DataFile, Dataset, DatasetRow, DatasetSource, Record};
use monitor_core::time_utils::{iso_date, parse_date_stem};
use tracing::{debug, warn};

use crate::loader::RecordSource;

/// Combine loaded records, in the given order, into one dataset.
///
/// Each source gets a `file_date` decoded from its file name, falling back to
/// the raw stem. Rows are tagged with `"<file_date> <clock time>"`, or with the
/// bare clock time when the name is not a date. Rows are neither sorted nor
/// de-duplicated.
///
/// Returns `None` when `records` is empty.
pub fn combine(records: Vec<(PathBuf, Arc<Record>)>) -> Option<Dataset> {
    if records.is_empty() {
        return None;
    }

    let mut sources = Vec::with_capacity(records.len());
    let mut rows = Vec::new();

    for (source_idx, (path, record)) in records.into_iter().enumerate() {
        let stem = file_stem(&path);
        let (file_date, date_parsed) = match parse_date_stem(&stem) {
            Some(date) => (iso_date(date), true),
            None => {
                debug!("File name {} is not a date; using it verbatim", stem);
                (stem, false)
            }
        };

        for row in 0..record.len() {
            let datetime = record.time_str(row).map(|time| {
                if date_parsed {
                    format!("{file_date} {time}")
                } else {
                    time.to_string()
                }
            });
            rows.push(DatasetRow {
                source: source_idx,
                row,
                datetime,
            });
        }

        sources.push(DatasetSource {
            record,
            file_date,
            date_parsed,
        });
    }

    Some(Dataset::from_parts(sources, rows))
}

/// Load `files` through `source` and combine whatever loaded.
///
/// A file that fails to load is logged and skipped. Returns `None` when no
/// file could be loaded.
pub fn load_dataset<S: RecordSource + ?Sized>(files: &[DataFile], source: &S) -> Option<Dataset> {
    let mut loaded = Vec::with_capacity(files.len());
    for file in files {
        match source.load_record(&file.path) {
            Ok(record) => loaded.push((file.path.clone(), record)),
            Err(e) => warn!("Skipping data file {}: {}", file.path.display(), e),
        }
    }

    if loaded.is_empty() && !files.is_empty() {
        warn!("None of {} data files could be loaded", files.len());
    }

    let dataset = combine(loaded)?;
    debug!(
        "Combined {} rows from {} files",
        dataset.len(),
        dataset.sources().len()
    );
    Some(dataset)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
