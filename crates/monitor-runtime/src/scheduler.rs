//! Unattended background loop.
//!
//! Two jobs share one tokio task so they never overlap: a frequent check of
//! the trailing-window files that raises the refresh signal when one changes,
//! and a once-a-day report at a fixed local time. A failing job is logged and
//! the loop carries on.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use monitor_core::error::MonitorError;
use monitor_core::schema::ChannelSchema;
use monitor_core::signal::RefreshSignal;
use monitor_core::time_utils::next_daily_occurrence;
use monitor_data::catalog::modification_times;
use tokio::time::{self, MissedTickBehavior};

use crate::data_manager::DataManager;
use crate::messaging::{Delivery, ReportSink};

/// Timing of the two scheduler jobs.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleConfig {
    /// Period of the file check.
    pub check_interval: Duration,
    /// Local wall-clock time of the daily report.
    pub report_time: NaiveTime,
    /// Length of the window the report covers.
    pub hours: u32,
}

/// File watcher and daily reporter.
///
/// Holds the last observed modification time of each watched file; only this
/// scheduler reads or writes it.
pub struct Scheduler<S> {
    manager: Arc<DataManager>,
    schema: Arc<ChannelSchema>,
    signal: RefreshSignal,
    sink: Option<Arc<S>>,
    config: ScheduleConfig,
    mtimes: BTreeMap<PathBuf, f64>,
}

impl<S: ReportSink + 'static> Scheduler<S> {
    /// `sink` is `None` when messaging is not configured; file checks still
    /// run and each report attempt fails with a logged reason.
    pub fn new(
        manager: Arc<DataManager>,
        schema: Arc<ChannelSchema>,
        signal: RefreshSignal,
        sink: Option<Arc<S>>,
        config: ScheduleConfig,
    ) -> Self {
        Self {
            manager,
            schema,
            signal,
            sink,
            config,
            mtimes: BTreeMap::new(),
        }
    }

    /// Record the current modification times without signalling, so
    /// startup does not count every existing file as new.
    pub fn prime(&mut self, today: NaiveDate) -> usize {
        let files = self.manager.catalog().files_for_trailing_window(today);
        self.mtimes = modification_times(&files);
        files.len()
    }

    /// Compare the trailing-window files against the previous check.
    ///
    /// A file not seen before, or with a newer modification time, counts as
    /// changed; any change writes the refresh signal. Returns whether
    /// something changed.
    pub fn check_file_updates(&mut self, today: NaiveDate) -> bool {
        let files = self.manager.catalog().files_for_trailing_window(today);
        let current = modification_times(&files);

        let mut changed = false;
        for (path, mtime) in &current {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            match self.mtimes.get(path) {
                Some(previous) if mtime > previous => {
                    tracing::info!("File updated: {}", name);
                    changed = true;
                }
                Some(_) => {}
                None => {
                    tracing::info!("New file detected: {}", name);
                    changed = true;
                }
            }
        }

        self.mtimes = current;

        if changed {
            tracing::info!("Writing refresh signal for dashboard");
            self.signal.write_now();
        }
        changed
    }

    /// Build the trailing-window report as of `now` and deliver it.
    pub async fn send_scheduled_report(&self, now: NaiveDateTime) -> Delivery {
        tracing::info!("Running scheduled report for {}", now);

        let Some(sink) = self.sink.as_ref() else {
            let message = "Messaging is not configured; report not sent";
            tracing::error!("{}", message);
            return Delivery::failed(message);
        };

        let manager = Arc::clone(&self.manager);
        let schema = Arc::clone(&self.schema);
        let hours = self.config.hours;
        let built = tokio::task::spawn_blocking(move || {
            manager.build_report(&schema, None, hours, now)
        })
        .await
        .map_err(|e| MonitorError::Io(std::io::Error::other(e)))
        .and_then(|r| r);

        let report = match built {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("Failed to build report: {}", e);
                return Delivery::failed(e.to_string());
            }
        };

        let delivery = sink.deliver(&report).await;
        if delivery.success {
            tracing::info!("Daily report sent: {}", delivery.message);
        } else {
            tracing::error!("Failed to send report: {}", delivery.message);
        }
        delivery
    }

    /// Run both jobs in a background task until aborted.
    pub fn start(mut self) -> SchedulerHandle {
        let handle = tokio::spawn(async move {
            let watched = self.prime(Local::now().date_naive());
            tracing::info!(
                files = watched,
                check_interval_secs = self.config.check_interval.as_secs(),
                report_time = %self.config.report_time,
                "scheduler started"
            );

            let mut check = time::interval(self.config.check_interval);
            check.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately; priming already covered it.
            check.tick().await;

            loop {
                let now = Local::now().naive_local();
                let until_report = (next_daily_occurrence(now, self.config.report_time) - now)
                    .to_std()
                    .unwrap_or(Duration::ZERO);

                tokio::select! {
                    _ = check.tick() => {
                        tracing::debug!("Running file check");
                        self.check_file_updates(Local::now().date_naive());
                    }
                    _ = time::sleep(until_report) => {
                        self.send_scheduled_report(Local::now().naive_local()).await;
                    }
                }
            }
        });

        SchedulerHandle { handle }
    }
}

// ── SchedulerHandle ───────────────────────────────────────────────────────────

/// A handle to the background scheduler task.
pub struct SchedulerHandle {
    handle: tokio::task::JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the loop. A report in flight is dropped.
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use monitor_data::report::Report;
    use std::future::Future;
    use std::sync::Mutex;
    use std::time::SystemTime;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingSink {
        reports: Mutex<Vec<Report>>,
    }

    impl ReportSink for RecordingSink {
        fn deliver(&self, report: &Report) -> impl Future<Output = Delivery> + Send {
            self.reports.lock().unwrap().push(report.clone());
            async { Delivery::ok("recorded") }
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn config() -> ScheduleConfig {
        ScheduleConfig {
            check_interval: Duration::from_secs(60),
            report_time: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            hours: 24,
        }
    }

    fn scheduler(
        dir: &TempDir,
        sink: Option<Arc<RecordingSink>>,
    ) -> Scheduler<RecordingSink> {
        Scheduler::new(
            Arc::new(DataManager::new(
                dir.path(),
                "heures",
                Duration::from_secs(300),
            )),
            Arc::new(ChannelSchema::dspx()),
            RefreshSignal::new(dir.path().join(".refresh_signal")),
            sink,
            config(),
        )
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn set_mtime(path: &PathBuf, secs_after_epoch: u64) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs_after_epoch))
            .unwrap();
    }

    #[test]
    fn test_check_detects_new_and_updated_files() {
        let dir = TempDir::new().unwrap();
        let signal = RefreshSignal::new(dir.path().join(".refresh_signal"));
        let mut sched = scheduler(&dir, None);
        let today = d(2024, 1, 2);

        assert_eq!(sched.prime(today), 0);
        assert!(!sched.check_file_updates(today));
        assert!(signal.read().is_none());

        let path = write(&dir, "010224.txt", "heures\tstill\n");
        set_mtime(&path, 1_000_000);
        assert!(sched.check_file_updates(today));
        assert!(signal.take().is_some());

        assert!(!sched.check_file_updates(today));
        assert!(signal.read().is_none());

        set_mtime(&path, 1_000_060);
        assert!(sched.check_file_updates(today));
        assert!(signal.read().is_some());
    }

    #[test]
    fn test_prime_suppresses_existing_files() {
        let dir = TempDir::new().unwrap();
        write(&dir, "010124.txt", "heures\tstill\n");
        write(&dir, "010224.txt", "heures\tstill\n");
        let mut sched = scheduler(&dir, None);

        assert_eq!(sched.prime(d(2024, 1, 2)), 2);
        assert!(!sched.check_file_updates(d(2024, 1, 2)));
    }

    #[test]
    fn test_older_mtime_is_not_a_change() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "010224.txt", "heures\tstill\n");
        set_mtime(&path, 2_000_000);
        let mut sched = scheduler(&dir, None);
        sched.prime(d(2024, 1, 2));

        set_mtime(&path, 1_000_000);
        assert!(!sched.check_file_updates(d(2024, 1, 2)));
    }

    #[tokio::test]
    async fn test_send_scheduled_report_delivers_trailing_summary() {
        let dir = TempDir::new().unwrap();
        write(&dir, "010124.txt", "heures\tfull range\n10:00:00\t0.5\n16:00:00\t0.4\n");
        write(&dir, "010224.txt", "heures\tfull range\n09:00:00\t0.3\n");
        let sink = Arc::new(RecordingSink::default());
        let sched = scheduler(&dir, Some(Arc::clone(&sink)));

        let now = d(2024, 1, 2).and_hms_opt(15, 0, 0).unwrap();
        let delivery = sched.send_scheduled_report(now).await;
        assert!(delivery.success);

        let reports = sink.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].label, "Last 24 hours");
        assert_eq!(reports[0].channels.len(), 1);
        assert_eq!(reports[0].channels[0].max, Some(0.4));
        assert_eq!(reports[0].channels[0].current, Some(0.3));
    }

    #[tokio::test]
    async fn test_send_scheduled_report_without_files_fails() {
        let dir = TempDir::new().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let sched = scheduler(&dir, Some(Arc::clone(&sink)));

        let now = d(2024, 1, 2).and_hms_opt(15, 0, 0).unwrap();
        let delivery = sched.send_scheduled_report(now).await;
        assert!(!delivery.success);
        assert!(delivery.message.contains("No data files found"));
        assert!(sink.reports.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_scheduled_report_without_sink_fails() {
        let dir = TempDir::new().unwrap();
        write(&dir, "010224.txt", "heures\tfull range\n09:00:00\t0.3\n");
        let sched = scheduler(&dir, None);

        let now = d(2024, 1, 2).and_hms_opt(15, 0, 0).unwrap();
        let delivery = sched.send_scheduled_report(now).await;
        assert!(!delivery.success);
        assert!(delivery.message.contains("not configured"));
    }

    #[tokio::test]
    async fn test_start_and_abort() {
        let dir = TempDir::new().unwrap();
        let handle = scheduler(&dir, None).start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());
        handle.abort();
    }
}
