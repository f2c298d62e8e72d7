//! TTL-cached access to the data pipeline.
//!
//! [`RecordCache`] keeps parsed files for a short time, keyed by path, so
//! repeated dashboard refreshes do not re-parse unchanged files.
//! [`DataManager`] ties the cache to the catalog and answers the two questions
//! callers ask: "what is in this date range" and "what happened in the last N
//! hours".

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{NaiveDate, NaiveDateTime};
use monitor_core::error::{MonitorError, Result};
use monitor_core::models::{DataFile, Dataset, Record};
use monitor_core::schema::ChannelSchema;
use monitor_data::aggregator::load_dataset;
use monitor_data::catalog::DataCatalog;
use monitor_data::loader::{RecordLoader, RecordSource};
use monitor_data::report::{label_for_range, Report};
use monitor_data::statistics::summarize;
use monitor_data::window::filter_trailing_hours;

// ── RecordCache ───────────────────────────────────────────────────────────────

struct CacheEntry {
    record: Arc<Record>,
    loaded_at: Instant,
}

/// Per-path cache of parsed records with a fixed time-to-live.
///
/// Parsing happens outside the lock. Two callers missing on the same path at
/// once both parse it and the later insert wins; records are immutable so
/// either copy is correct.
pub struct RecordCache {
    loader: RecordLoader,
    ttl: Duration,
    entries: Mutex<HashMap<PathBuf, CacheEntry>>,
}

impl RecordCache {
    pub fn new(loader: RecordLoader, ttl: Duration) -> Self {
        Self {
            loader,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Drop every cached record.
    pub fn invalidate(&self) {
        let mut entries = self.lock();
        let dropped = entries.len();
        entries.clear();
        tracing::debug!(dropped, "record cache invalidated");
    }

    /// Number of cached records, fresh or not.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, CacheEntry>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn fresh(&self, path: &Path) -> Option<Arc<Record>> {
        let entries = self.lock();
        let entry = entries.get(path)?;
        (entry.loaded_at.elapsed() < self.ttl).then(|| Arc::clone(&entry.record))
    }
}

impl RecordSource for RecordCache {
    fn load_record(&self, path: &Path) -> Result<Arc<Record>> {
        if let Some(record) = self.fresh(path) {
            tracing::debug!(path = %path.display(), "record cache hit");
            return Ok(record);
        }

        let record = Arc::new(self.loader.load(path)?);
        self.lock().insert(
            path.to_path_buf(),
            CacheEntry {
                record: Arc::clone(&record),
                loaded_at: Instant::now(),
            },
        );
        Ok(record)
    }
}

// ── DataManager ───────────────────────────────────────────────────────────────

/// Files selected for a view and the dataset built from them.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub files: Vec<DataFile>,
    pub dataset: Dataset,
}

/// Catalog plus record cache.
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// use monitor_runtime::data_manager::DataManager;
///
/// let mgr = DataManager::new("data", "heures", Duration::from_secs(300));
/// if let Ok(loaded) = mgr.load_trailing(chrono::Local::now().naive_local(), 24) {
///     println!("{} rows", loaded.dataset.len());
/// }
/// ```
pub struct DataManager {
    catalog: DataCatalog,
    cache: RecordCache,
}

impl DataManager {
    /// `time_column` is the clock column header of the device's files.
    pub fn new(data_dir: impl Into<PathBuf>, time_column: &str, cache_ttl: Duration) -> Self {
        Self {
            catalog: DataCatalog::new(data_dir),
            cache: RecordCache::new(RecordLoader::new(time_column), cache_ttl),
        }
    }

    pub fn catalog(&self) -> &DataCatalog {
        &self.catalog
    }

    pub fn cache(&self) -> &RecordCache {
        &self.cache
    }

    /// Discard cached records so the next load re-parses every file.
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    /// Every day in `[start, end]` that has a file, concatenated.
    ///
    /// Fails with [`MonitorError::NoDataFiles`] when the range has no file and
    /// with [`MonitorError::NoData`] when none of them loads.
    pub fn load_range(&self, start: NaiveDate, end: NaiveDate) -> Result<LoadedData> {
        let files = self.catalog.files_for_range(start, end);
        self.load_files(files)
    }

    /// The files covering the last `hours` before `now`, narrowed to that
    /// window.
    ///
    /// The filtered dataset may be empty.
    pub fn load_trailing(&self, now: NaiveDateTime, hours: u32) -> Result<LoadedData> {
        let files = self.catalog.files_for_trailing_hours(now, hours);
        let loaded = self.load_files(files)?;
        Ok(LoadedData {
            dataset: filter_trailing_hours(&loaded.dataset, hours, now),
            files: loaded.files,
        })
    }

    /// Load an explicit day range, or the trailing `hours` when `range` is
    /// `None`.
    pub fn load(
        &self,
        range: Option<(NaiveDate, NaiveDate)>,
        hours: u32,
        now: NaiveDateTime,
    ) -> Result<LoadedData> {
        match range {
            Some((start, end)) => self.load_range(start, end),
            None => self.load_trailing(now, hours),
        }
    }

    /// Summarize the schema's report channels over the selected data.
    ///
    /// Fails when nothing loads or none of the report channels is present.
    pub fn build_report(
        &self,
        schema: &ChannelSchema,
        range: Option<(NaiveDate, NaiveDate)>,
        hours: u32,
        now: NaiveDateTime,
    ) -> Result<Report> {
        let loaded = self.load(range, hours, now)?;
        let summary = summarize(&loaded.dataset, &schema.report_channels);
        if summary.is_empty() {
            return Err(MonitorError::NoData("No statistics calculated".into()));
        }
        Ok(Report::from_summary(
            &summary,
            schema,
            label_for_range(range, hours),
            now,
        ))
    }

    fn load_files(&self, files: Vec<DataFile>) -> Result<LoadedData> {
        if files.is_empty() {
            return Err(MonitorError::NoDataFiles(self.catalog.data_dir().to_path_buf()));
        }
        let dataset = load_dataset(&files, &self.cache).ok_or_else(|| {
            MonitorError::NoData(format!("{} files failed to load", files.len()))
        })?;
        tracing::debug!(
            files = files.len(),
            rows = dataset.len(),
            "dataset loaded"
        );
        Ok(LoadedData { files, dataset })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
