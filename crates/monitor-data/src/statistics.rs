//! Per-channel summaries over a dataset.
//!
//! Missing and non-numeric cells are "no value": they never count as zero,
//! but they keep their row slot so rate windows stay aligned with the
//! sampling cadence.

use monitor_core::models::{coerce_numeric, ChannelStats, Dataset, ValveState};
use monitor_core::schema::ChannelSchema;
use serde::Serialize;

/// Samples in one rate window: 15 minutes at one sample every 30 seconds.
pub const SAMPLES_PER_WINDOW: usize = 30;

/// Minutes covered by one rate window.
pub const WINDOW_MINUTES: f64 = 15.0;

/// Statistics for a set of channels, in request order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    entries: Vec<(String, ChannelStats)>,
}

impl Summary {
    pub fn get(&self, channel: &str) -> Option<&ChannelStats> {
        self.entries
            .iter()
            .find(|(name, _)| name == channel)
            .map(|(_, stats)| stats)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ChannelStats)> {
        self.entries.iter().map(|(name, stats)| (name.as_str(), stats))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Summarize each requested channel present in `dataset`.
///
/// Channels the dataset does not have are left out of the result. A repeated
/// channel name is summarized once.
pub fn summarize<S: AsRef<str>>(dataset: &Dataset, channels: &[S]) -> Summary {
    let mut entries: Vec<(String, ChannelStats)> = Vec::with_capacity(channels.len());
    for channel in channels {
        let name = channel.as_ref();
        if entries.iter().any(|(n, _)| n == name) {
            continue;
        }
        if let Some(values) = dataset.numeric_column(name) {
            entries.push((name.to_string(), channel_stats(&values)));
        }
    }
    Summary { entries }
}

/// Statistics over one column's slots.
pub fn channel_stats(values: &[Option<f64>]) -> ChannelStats {
    let present: Vec<f64> = values.iter().flatten().copied().collect();

    let (min, max, mean) = if present.is_empty() {
        (None, None, None)
    } else {
        let min = present.iter().copied().fold(f64::INFINITY, f64::min);
        let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = present.iter().sum::<f64>() / present.len() as f64;
        (Some(min), Some(max), Some(mean))
    };

    ChannelStats {
        min,
        max,
        mean,
        current: present.last().copied(),
        avg_rate_per_min: average_rate_per_min(values),
    }
}

/// Mean change per minute over consecutive 30-sample windows.
///
/// Window `k` runs from slot `30k` to slot `30k + 30`, so it needs 31 slots;
/// 1800 samples give 59 windows. Windows with a missing endpoint are skipped.
/// Yields `0.0` when no window has a defined rate.
pub fn average_rate_per_min(values: &[Option<f64>]) -> f64 {
    if values.len() < SAMPLES_PER_WINDOW {
        return 0.0;
    }

    let rates: Vec<f64> = (0..values.len() - SAMPLES_PER_WINDOW)
        .step_by(SAMPLES_PER_WINDOW)
        .filter_map(|i| match (values[i], values[i + SAMPLES_PER_WINDOW]) {
            (Some(start), Some(end)) => Some((end - start) / WINDOW_MINUTES),
            _ => None,
        })
        .collect();

    if rates.is_empty() {
        0.0
    } else {
        rates.iter().sum::<f64>() / rates.len() as f64
    }
}

/// Last present numeric value of `column`.
pub fn latest_value(dataset: &Dataset, column: &str) -> Option<f64> {
    (0..dataset.len())
        .rev()
        .find_map(|i| dataset.value(i, column).and_then(coerce_numeric))
}

/// State of every schema valve in the dataset's last row.
///
/// Valves the dataset lacks, and every valve of an empty dataset, read as
/// unknown.
pub fn latest_valve_states(dataset: &Dataset, schema: &ChannelSchema) -> Vec<(String, ValveState)> {
    let last = dataset.len().checked_sub(1);
    schema
        .valves
        .iter()
        .map(|valve| {
            let cell = last.and_then(|i| dataset.value(i, &valve.name));
            (valve.name.clone(), ValveState::from_cell(cell))
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
