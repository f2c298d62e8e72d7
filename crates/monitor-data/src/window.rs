//! Row selection over an aggregated dataset.

use chrono::{Duration, NaiveDateTime};
use monitor_core::models::{Dataset, DatasetRow};
use monitor_core::time_utils::parse_datetime;
use tracing::{info, warn};

/// Default point budget of a dashboard chart.
pub const DEFAULT_CHART_POINTS: usize = 2000;

/// Keep the rows stamped within `hours` of `now`, boundary included.
///
/// Rows whose composite key does not parse as `YYYY-MM-DD HH:MM:SS` are
/// dropped, including rows keyed by a bare clock time. A dataset without any
/// composite key is returned unchanged.
pub fn filter_trailing_hours(dataset: &Dataset, hours: u32, now: NaiveDateTime) -> Dataset {
    if !dataset.has_datetime() {
        warn!("Dataset has no datetime key; cannot filter to last {} hours", hours);
        return dataset.clone();
    }

    let cutoff = now - Duration::hours(i64::from(hours));
    let rows: Vec<DatasetRow> = dataset
        .rows()
        .iter()
        .filter(|row| {
            row.datetime
                .as_deref()
                .and_then(parse_datetime)
                .is_some_and(|t| t >= cutoff)
        })
        .cloned()
        .collect();

    info!(
        "Filtered data from {} to {} rows (last {} hours)",
        dataset.len(),
        rows.len(),
        hours
    );
    dataset.with_rows(rows)
}

/// Thin a dataset for charting by keeping every `len / max_points`-th row,
/// starting with the first.
///
/// Datasets already within budget are returned unchanged.
pub fn downsample(dataset: &Dataset, max_points: usize) -> Dataset {
    if max_points == 0 || dataset.len() <= max_points {
        return dataset.clone();
    }
    let step = dataset.len() / max_points;
    let rows = dataset.rows().iter().step_by(step).cloned().collect();
    dataset.with_rows(rows)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
