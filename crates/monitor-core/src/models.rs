use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

// ── DataFile ──────────────────────────────────────────────────────────────────

/// A per-day data file discovered in the data directory.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFile {
    /// Full path to the file.
    pub path: PathBuf,
    /// Calendar date decoded from the `MMDDYY` file name.
    pub date: NaiveDate,
    /// Last modification time, if the file could be stat'ed.
    pub modified: Option<SystemTime>,
}

impl DataFile {
    /// File name component (`"010124.txt"`), lossily converted.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

// ── Numeric coercion ──────────────────────────────────────────────────────────

/// Coerce a cell to a number.
///
/// Empty text, non-numeric text and `NaN` are all "no value"; they are never
/// turned into zero.
pub fn coerce_numeric(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| !v.is_nan())
}

// ── Record ────────────────────────────────────────────────────────────────────

/// One row of a parsed data file.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRow {
    /// Cleaned cell text, one entry per header column.
    pub values: Vec<String>,
    /// Parsed clock time, `None` when absent or not `HH:MM:SS`.
    pub time_of_day: Option<NaiveTime>,
}

/// The normalized content of one data file.
///
/// A record carries no file identity; the aggregator attaches the file date.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<RecordRow>,
    time_column: Option<usize>,
}

impl Record {
    /// Build a record from cleaned headers and rows.
    ///
    /// `time_column` is the index of the clock-time column, if the file has
    /// one. When a header name repeats, lookups by name resolve to the first
    /// occurrence.
    pub fn new(columns: Vec<String>, rows: Vec<RecordRow>, time_column: Option<usize>) -> Self {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            index.entry(name.clone()).or_insert(i);
        }
        Self {
            columns,
            index,
            rows,
            time_column,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[RecordRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `column` in the header.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    /// Whether the file carried a clock-time column.
    pub fn has_time(&self) -> bool {
        self.time_column.is_some()
    }

    /// Cell text for `column` in row `row`.
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.values.get(col).map(String::as_str)
    }

    /// Raw clock-time text of row `row`, kept even when it failed to parse.
    pub fn time_str(&self, row: usize) -> Option<&str> {
        let col = self.time_column?;
        self.rows.get(row)?.values.get(col).map(String::as_str)
    }
}

// ── Dataset ───────────────────────────────────────────────────────────────────

/// One input file of a [`Dataset`].
#[derive(Debug, Clone)]
pub struct DatasetSource {
    /// Parsed file content, shared with the record cache.
    pub record: Arc<Record>,
    /// `YYYY-MM-DD` decoded from the file name, or the raw file stem when the
    /// name is not a valid date.
    pub file_date: String,
    /// Whether `file_date` is a real decoded date.
    pub date_parsed: bool,
}

/// A row of a [`Dataset`]: a reference into one source record plus the
/// derived composite time key.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRow {
    /// Index into [`Dataset::sources`].
    pub source: usize,
    /// Row index within that source's record.
    pub row: usize,
    /// `"YYYY-MM-DD HH:MM:SS"`, or the bare clock time when the file date
    /// could not be decoded, or `None` when the file has no time column.
    pub datetime: Option<String>,
}

/// Ordered concatenation of records from one or more files.
///
/// Rows keep file order, then in-file order; nothing is re-sorted. Filtering
/// yields a new dataset that shares the same source records.
#[derive(Debug, Clone)]
pub struct Dataset {
    sources: Vec<DatasetSource>,
    columns: Vec<String>,
    rows: Vec<DatasetRow>,
}

impl Dataset {
    /// Assemble a dataset from its sources and row references.
    ///
    /// The column list is the union of all source headers in first-seen order.
    pub fn from_parts(sources: Vec<DatasetSource>, rows: Vec<DatasetRow>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for source in &sources {
            for name in source.record.columns() {
                if !columns.contains(name) {
                    columns.push(name.clone());
                }
            }
        }
        Self {
            sources,
            columns,
            rows,
        }
    }

    /// A dataset over the same sources keeping only `rows`.
    pub fn with_rows(&self, rows: Vec<DatasetRow>) -> Self {
        Self {
            sources: self.sources.clone(),
            columns: self.columns.clone(),
            rows,
        }
    }

    pub fn sources(&self) -> &[DatasetSource] {
        &self.sources
    }

    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    /// Union of the column names of all sources.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.sources.iter().any(|s| s.record.has_column(column))
    }

    /// Whether the composite `datetime` key exists, i.e. at least one source
    /// file had a clock-time column.
    pub fn has_datetime(&self) -> bool {
        self.sources.iter().any(|s| s.record.has_time())
    }

    /// Cell text of `column` in dataset row `index`.
    pub fn value(&self, index: usize, column: &str) -> Option<&str> {
        let row = self.rows.get(index)?;
        self.sources.get(row.source)?.record.value(row.row, column)
    }

    /// Raw clock-time text of dataset row `index`.
    pub fn time_str(&self, index: usize) -> Option<&str> {
        let row = self.rows.get(index)?;
        self.sources.get(row.source)?.record.time_str(row.row)
    }

    /// Composite time key of dataset row `index`.
    pub fn datetime(&self, index: usize) -> Option<&str> {
        self.rows.get(index)?.datetime.as_deref()
    }

    /// File date of dataset row `index`.
    pub fn file_date(&self, index: usize) -> Option<&str> {
        let row = self.rows.get(index)?;
        self.sources.get(row.source).map(|s| s.file_date.as_str())
    }

    /// Best available x-axis label for row `index`: the composite key, else
    /// the raw clock time.
    pub fn time_label(&self, index: usize) -> Option<&str> {
        self.datetime(index).or_else(|| self.time_str(index))
    }

    /// Numeric view of `column`, one slot per row (`None` = no value).
    ///
    /// Returns `None` when no source has the column at all.
    pub fn numeric_column(&self, column: &str) -> Option<Vec<Option<f64>>> {
        if !self.has_column(column) {
            return None;
        }
        Some(
            (0..self.rows.len())
                .map(|i| self.value(i, column).and_then(coerce_numeric))
                .collect(),
        )
    }
}

// ── Statistics ────────────────────────────────────────────────────────────────

/// Summary of one channel over a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    /// Smallest present value.
    pub min: Option<f64>,
    /// Largest present value.
    pub max: Option<f64>,
    /// Arithmetic mean of present values.
    pub mean: Option<f64>,
    /// Last present value in row order.
    pub current: Option<f64>,
    /// Mean of the 15-minute window rates, in units per minute.
    pub avg_rate_per_min: f64,
}

/// Open/closed state of a valve in the latest row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValveState {
    Open,
    Closed,
    Unknown,
}

impl ValveState {
    /// `1` is open, any other number is closed, anything else is unknown.
    pub fn from_cell(cell: Option<&str>) -> Self {
        match cell.and_then(coerce_numeric) {
            Some(v) if v.trunc() == 1.0 => ValveState::Open,
            Some(_) => ValveState::Closed,
            None => ValveState::Unknown,
        }
    }

    /// Grid marker: `[O]`, `[X]` or `[?]`.
    pub fn marker(&self) -> &'static str {
        match self {
            ValveState::Open => "[O]",
            ValveState::Closed => "[X]",
            ValveState::Unknown => "[?]",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
