//! Discovery of per-day data files by their `MMDDYY.txt` names.
//!
//! Nothing here fails: a missing directory, an unreadable entry or a file name
//! that is not a valid date all mean "not available".

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use monitor_core::models::DataFile;
use monitor_core::time_utils::{file_name_for, parse_file_date, system_time_to_unix};
use tracing::{debug, warn};

/// Read-only view of the data directory.
#[derive(Debug, Clone)]
pub struct DataCatalog {
    data_dir: PathBuf,
}

impl DataCatalog {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Every data file whose name decodes to a date, ascending by date.
    pub fn list_files(&self) -> Vec<DataFile> {
        if !self.data_dir.is_dir() {
            warn!("Data directory does not exist: {}", self.data_dir.display());
            return Vec::new();
        }

        let mut files: Vec<DataFile> = walkdir::WalkDir::new(&self.data_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let date = parse_file_date(entry.file_name().to_str()?)?;
                let modified = entry.metadata().ok().and_then(|m| m.modified().ok());
                Some(DataFile {
                    path: entry.into_path(),
                    date,
                    modified,
                })
            })
            .collect();

        files.sort_by_key(|f| f.date);
        debug!(
            "Found {} data files in {}",
            files.len(),
            self.data_dir.display()
        );
        files
    }

    /// Earliest and latest date with a data file, or `None` when there are
    /// none.
    pub fn available_date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let files = self.list_files();
        let first = files.first()?.date;
        let last = files.last()?.date;
        Some((first, last))
    }

    /// Files for every day in `[start, end]` that has one, ascending.
    ///
    /// Days without a file are skipped. An inverted range is empty.
    pub fn files_for_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<DataFile> {
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter_map(|d| self.dated_file(d))
            .collect()
    }

    /// Yesterday's and today's files, whichever exist.
    ///
    /// Together they cover any trailing 24-hour window ending today.
    pub fn files_for_trailing_window(&self, today: NaiveDate) -> Vec<DataFile> {
        let yesterday = today - Duration::days(1);
        self.files_for_range(yesterday, today)
    }

    /// Every file that can hold a row of the `hours` before `now`.
    ///
    /// Never fewer days than [`files_for_trailing_window`](Self::files_for_trailing_window);
    /// longer windows reach back to the day the cutoff falls on.
    pub fn files_for_trailing_hours(&self, now: NaiveDateTime, hours: u32) -> Vec<DataFile> {
        let today = now.date();
        let cutoff_day = (now - Duration::hours(i64::from(hours))).date();
        self.files_for_range(cutoff_day.min(today - Duration::days(1)), today)
    }

    fn dated_file(&self, date: NaiveDate) -> Option<DataFile> {
        let path = self.data_dir.join(file_name_for(date));
        let meta = std::fs::metadata(&path).ok()?;
        if !meta.is_file() {
            return None;
        }
        Some(DataFile {
            path,
            date,
            modified: meta.modified().ok(),
        })
    }
}

/// Current modification time of each file in UNIX seconds.
///
/// A file that can no longer be stat'ed reports `0.0`.
pub fn modification_times(files: &[DataFile]) -> BTreeMap<PathBuf, f64> {
    files
        .iter()
        .map(|f| {
            let mtime = std::fs::metadata(&f.path)
                .and_then(|m| m.modified())
                .map(system_time_to_unix)
                .unwrap_or(0.0);
            (f.path.clone(), mtime)
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
