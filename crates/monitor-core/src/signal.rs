//! Advisory "new data landed" flag shared between processes.
//!
//! The scheduler writes the current UNIX time to a small plaintext file; the
//! dashboard reads it, clears it, and polls faster for a while. The file
//! holds a single float and nothing else. Every operation is best-effort:
//! I/O failures are logged and swallowed, malformed content reads as "no
//! signal", and concurrent writers simply race with the last rename winning.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::time_utils::unix_now;

/// Default name of the signal file.
pub const DEFAULT_SIGNAL_FILE: &str = ".refresh_signal";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

// ── RefreshSignal ─────────────────────────────────────────────────────────────

/// Handle on the signal file. Cheap to clone; holds no open descriptors.
#[derive(Debug, Clone)]
pub struct RefreshSignal {
    path: PathBuf,
}

impl RefreshSignal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record that data changed at `timestamp` (UNIX seconds), replacing any
    /// pending value.
    ///
    /// The value is written to a private temp file and renamed into place so
    /// a concurrent reader sees either the old or the new value, never a torn
    /// one.
    pub fn write(&self, timestamp: f64) {
        let seq = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp = self
            .path
            .with_extension(format!("tmp.{}.{}", std::process::id(), seq));

        let result = std::fs::write(&tmp, timestamp.to_string())
            .and_then(|()| std::fs::rename(&tmp, &self.path));

        if let Err(e) = result {
            let _ = std::fs::remove_file(&tmp);
            tracing::warn!(
                error = %e,
                path = %self.path.display(),
                "failed to write refresh signal"
            );
        }
    }

    /// [`write`](Self::write) with the current time.
    pub fn write_now(&self) {
        self.write(unix_now());
    }

    /// The pending timestamp, or `None` when absent or unreadable.
    pub fn read(&self) -> Option<f64> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match content.trim().parse::<f64>() {
            Ok(ts) if ts.is_finite() => Some(ts),
            _ => {
                tracing::debug!(path = %self.path.display(), "ignoring malformed refresh signal");
                None
            }
        }
    }

    /// Remove the pending signal. A missing file is not an error.
    pub fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %self.path.display(),
                    "failed to clear refresh signal"
                );
            }
        }
    }

    /// Read and clear in one step, returning what was pending.
    pub fn take(&self) -> Option<f64> {
        let value = self.read();
        if value.is_some() {
            self.clear();
        }
        value
    }
}

// ── PollPolicy ────────────────────────────────────────────────────────────────

/// How the dashboard picks its next poll interval from the signal.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// A signal younger than this counts as fresh.
    pub fresh_threshold: Duration,
    /// Interval used right after fresh data.
    pub fast_interval: Duration,
    /// Interval used otherwise.
    pub default_interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            fresh_threshold: Duration::from_secs(120),
            fast_interval: Duration::from_secs(5),
            default_interval: Duration::from_secs(60),
        }
    }
}

impl PollPolicy {
    /// Interval to wait before the next poll given a signal observed at `now`.
    ///
    /// Signals stamped in the future (clock skew between processes) count as
    /// fresh.
    pub fn next_interval(&self, signal: Option<f64>, now: f64) -> Duration {
        match signal {
            Some(ts) if now - ts < self.fresh_threshold.as_secs_f64() => self.fast_interval,
            _ => self.default_interval,
        }
    }

    /// Consume the pending signal and return the next interval.
    pub fn consume(&self, signal: &RefreshSignal, now: f64) -> Duration {
        self.next_interval(signal.take(), now)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
