//! Application state and TUI event loop for the dashboard.
//!
//! [`App`] owns the theme, the current [`DashboardState`] and the reload
//! schedule. Reloads happen on a timer whose period follows the refresh
//! signal: a fresh signal from the scheduler shortens the next wait.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};
use tokio::task::JoinHandle;

use monitor_core::error::MonitorError;
use monitor_core::schema::ChannelSchema;
use monitor_core::signal::{PollPolicy, RefreshSignal};
use monitor_core::time_utils::unix_now;
use monitor_runtime::data_manager::DataManager;
use monitor_runtime::messaging::{Delivery, ReportSink, SlackClient};

use crate::dashboard_view::{self, DashboardState};
use crate::themes::Theme;

const NOT_CONFIGURED: &str = "Messaging is not configured; report not sent";

/// What the dashboard shows and how often it reloads.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Explicit day range, or `None` for the trailing window.
    pub range: Option<(NaiveDate, NaiveDate)>,
    pub hours: u32,
    pub policy: PollPolicy,
}

// ── Terminal ──────────────────────────────────────────────────────────────────

/// Raw mode and the alternate screen for as long as the guard lives.
///
/// Restoring on drop covers every exit from [`App::run`], including an
/// early `?` return and the run future being dropped by a `select!`.
struct TerminalGuard {
    _private: (),
}

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let guard = Self { _private: () };
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, cursor::Show);
    }
}

// ── App ───────────────────────────────────────────────────────────────────────

/// Root application state for the dashboard TUI.
pub struct App<S = SlackClient> {
    pub theme: Theme,
    manager: Arc<DataManager>,
    schema: Arc<ChannelSchema>,
    signal: RefreshSignal,
    sink: Option<Arc<S>>,
    config: DashboardConfig,
    /// Most recently built view.
    pub state: DashboardState,
    /// One-line feedback shown in the footer.
    pub status: Option<String>,
    /// Set to `true` to break out of the event loop on the next iteration.
    pub should_quit: bool,
    next_refresh: Instant,
    pending_report: Option<JoinHandle<Delivery>>,
}

impl<S: ReportSink + 'static> App<S> {
    /// `sink` is `None` when messaging is not configured; the `s` key then
    /// only reports that.
    pub fn new(
        theme_name: &str,
        manager: Arc<DataManager>,
        schema: Arc<ChannelSchema>,
        signal: RefreshSignal,
        sink: Option<Arc<S>>,
        config: DashboardConfig,
    ) -> Self {
        Self {
            theme: Theme::from_name(theme_name),
            manager,
            schema,
            signal,
            sink,
            config,
            state: DashboardState::Loading,
            status: None,
            should_quit: false,
            next_refresh: Instant::now(),
            pending_report: None,
        }
    }

    // ── Event loop ────────────────────────────────────────────────────────────

    /// Run the dashboard until `q`, `Q` or `Ctrl+C`.
    ///
    /// Keyboard events are polled with a 250 ms timeout so reload timers and
    /// report completions are picked up between key presses.
    pub async fn run(mut self) -> io::Result<()> {
        let _guard = TerminalGuard::enter()?;
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;

        let tick_rate = Duration::from_millis(250);

        loop {
            if Instant::now() >= self.next_refresh {
                self.refresh(false);
            }
            self.poll_report().await;

            terminal.draw(|frame| self.render(frame))?;

            if event::poll(tick_rate)? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key);
                }
            }

            if self.should_quit {
                return Ok(());
            }
        }
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        dashboard_view::render_dashboard(
            frame,
            area,
            &self.state,
            self.status.as_deref(),
            &self.theme,
        );
    }

    // ── Actions ───────────────────────────────────────────────────────────────

    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') | KeyCode::Char('Q') => self.should_quit = true,
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.refresh(true);
                self.status = Some("Cache cleared, data reloaded".to_string());
            }
            KeyCode::Char('s') | KeyCode::Char('S') => self.request_report(),
            _ => {}
        }
    }

    /// Rebuild the view and schedule the next reload.
    ///
    /// A hard refresh drops every cached record first. Returns the wait until
    /// the next reload.
    pub fn refresh(&mut self, hard: bool) -> Duration {
        if hard {
            tracing::info!("Hard refresh requested");
            self.manager.invalidate();
        }

        let now = Local::now().naive_local();
        self.state = dashboard_view::build_state(
            &self.manager,
            &self.schema,
            self.config.range,
            self.config.hours,
            now,
        );

        let interval = self.config.policy.consume(&self.signal, unix_now());
        tracing::debug!(interval_secs = interval.as_secs(), "next dashboard reload");
        self.next_refresh = Instant::now() + interval;
        interval
    }

    /// Build and deliver the report for the current view in the background.
    pub fn request_report(&mut self) {
        if self.pending_report.is_some() {
            self.status = Some("A report is already being sent".to_string());
            return;
        }
        let Some(sink) = self.sink.as_ref().map(Arc::clone) else {
            tracing::warn!("{}", NOT_CONFIGURED);
            self.status = Some(NOT_CONFIGURED.to_string());
            return;
        };

        let manager = Arc::clone(&self.manager);
        let schema = Arc::clone(&self.schema);
        let range = self.config.range;
        let hours = self.config.hours;

        self.pending_report = Some(tokio::spawn(async move {
            let now = Local::now().naive_local();
            let built = tokio::task::spawn_blocking(move || {
                manager.build_report(&schema, range, hours, now)
            })
            .await
            .map_err(|e| MonitorError::Io(std::io::Error::other(e)))
            .and_then(|r| r);

            match built {
                Ok(report) => sink.deliver(&report).await,
                Err(e) => Delivery::failed(e.to_string()),
            }
        }));
        self.status = Some("Sending report…".to_string());
    }

    /// Pick up a finished report task, if any. Never waits on a running one.
    pub async fn poll_report(&mut self) {
        let finished = self
            .pending_report
            .as_ref()
            .is_some_and(|handle| handle.is_finished());
        if !finished {
            return;
        }
        let Some(handle) = self.pending_report.take() else {
            return;
        };

        let delivery = handle
            .await
            .unwrap_or_else(|e| Delivery::failed(format!("Report task failed: {e}")));
        self.status = Some(if delivery.success {
            format!("Report sent: {}", delivery.message)
        } else {
            format!("Report failed: {}", delivery.message)
        });
    }

    pub fn is_sending(&self) -> bool {
        self.pending_report.is_some()
    }
}

impl<S> Drop for App<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending_report.take() {
            handle.abort();
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use monitor_data::report::Report;
    use std::future::Future;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingSink {
        reports: Mutex<Vec<Report>>,
    }

    impl ReportSink for RecordingSink {
        fn deliver(&self, report: &Report) -> impl Future<Output = Delivery> + Send {
            self.reports.lock().unwrap().push(report.clone());
            async { Delivery::ok("Message sent to channel #test") }
        }
    }

    /// Accepts the report and never finishes delivering it.
    struct StalledSink;

    impl ReportSink for StalledSink {
        fn deliver(&self, _report: &Report) -> impl Future<Output = Delivery> + Send {
            std::future::pending()
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn app(dir: &TempDir, sink: Option<Arc<RecordingSink>>) -> App<RecordingSink> {
        App::new(
            "dark",
            Arc::new(DataManager::new(dir.path(), "heures", Duration::from_secs(300))),
            Arc::new(ChannelSchema::dspx()),
            RefreshSignal::new(dir.path().join(".refresh_signal")),
            sink,
            DashboardConfig {
                range: Some((d(2024, 1, 1), d(2024, 1, 1))),
                hours: 24,
                policy: PollPolicy::default(),
            },
        )
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("010124.txt"),
            "heures\tfull range\n10:00:00\t0.5\n10:00:30\t0.4\n",
        )
        .unwrap();
        dir
    }

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    #[test]
    fn test_app_starts_loading() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, None);
        assert_eq!(app.state, DashboardState::Loading);
        assert!(!app.should_quit);
        assert!(app.status.is_none());
    }

    #[test]
    fn test_refresh_builds_snapshot() {
        let dir = fixture();
        let mut app = app(&dir, None);
        app.refresh(false);
        match &app.state {
            DashboardState::Ready(snap) => assert_eq!(snap.rows, 2),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn test_refresh_follows_signal_policy() {
        let dir = fixture();
        let signal = RefreshSignal::new(dir.path().join(".refresh_signal"));
        let mut app = app(&dir, None);
        let policy = PollPolicy::default();

        signal.write_now();
        assert_eq!(app.refresh(false), policy.fast_interval);
        assert!(signal.read().is_none(), "signal is consumed once observed");
        assert_eq!(app.refresh(false), policy.default_interval);
    }

    #[test]
    fn test_quit_keys() {
        let dir = TempDir::new().unwrap();
        for event in [
            key('q'),
            key('Q'),
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
        ] {
            let mut app = app(&dir, None);
            app.handle_key(event);
            assert!(app.should_quit);
        }
    }

    #[test]
    fn test_plain_c_does_not_quit() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir, None);
        app.handle_key(key('c'));
        assert!(!app.should_quit);
    }

    #[test]
    fn test_hard_refresh_rereads_files() {
        let dir = fixture();
        let mut app = app(&dir, None);
        app.refresh(false);

        std::fs::write(
            dir.path().join("010124.txt"),
            "heures\tfull range\n10:00:00\t0.5\n10:00:30\t0.4\n10:01:00\t0.3\n",
        )
        .unwrap();
        app.refresh(false);
        match &app.state {
            DashboardState::Ready(snap) => assert_eq!(snap.rows, 2, "cached record reused"),
            other => panic!("unexpected state {other:?}"),
        }

        app.handle_key(key('r'));
        match &app.state {
            DashboardState::Ready(snap) => assert_eq!(snap.rows, 3),
            other => panic!("unexpected state {other:?}"),
        }
        assert_eq!(app.status.as_deref(), Some("Cache cleared, data reloaded"));
    }

    #[test]
    fn test_send_without_messaging() {
        let dir = fixture();
        let mut app = app(&dir, None);
        app.handle_key(key('s'));
        assert_eq!(app.status.as_deref(), Some(NOT_CONFIGURED));
        assert!(!app.is_sending());
    }

    #[tokio::test]
    async fn test_send_report_delivers_and_reports_status() {
        let dir = fixture();
        let sink = Arc::new(RecordingSink::default());
        let mut app = app(&dir, Some(Arc::clone(&sink)));

        app.handle_key(key('s'));
        assert!(app.is_sending());
        app.handle_key(key('s'));
        assert_eq!(app.status.as_deref(), Some("A report is already being sent"));

        for _ in 0..200 {
            app.poll_report().await;
            if !app.is_sending() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(!app.is_sending());
        assert_eq!(
            app.status.as_deref(),
            Some("Report sent: Message sent to channel #test")
        );
        let reports = sink.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].label, "2024-01-01");
    }

    #[tokio::test]
    async fn test_send_report_without_data_fails() {
        let dir = TempDir::new().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let mut app = app(&dir, Some(Arc::clone(&sink)));

        app.request_report();
        for _ in 0..200 {
            app.poll_report().await;
            if !app.is_sending() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let status = app.status.clone().unwrap_or_default();
        assert!(status.starts_with("Report failed: No data files found"), "{status}");
        assert!(sink.reports.lock().unwrap().is_empty());
    }

    #[test]
    fn test_terminal_guard_drop_outside_raw_mode() {
        drop(TerminalGuard { _private: () });
        drop(TerminalGuard { _private: () });
    }

    #[tokio::test]
    async fn test_dropping_app_aborts_pending_report() {
        let dir = fixture();
        let sink = Arc::new(StalledSink);
        let mut app = App::new(
            "dark",
            Arc::new(DataManager::new(dir.path(), "heures", Duration::from_secs(300))),
            Arc::new(ChannelSchema::dspx()),
            RefreshSignal::new(dir.path().join(".refresh_signal")),
            Some(Arc::clone(&sink)),
            DashboardConfig {
                range: Some((d(2024, 1, 1), d(2024, 1, 1))),
                hours: 24,
                policy: PollPolicy::default(),
            },
        );

        app.request_report();
        assert!(app.is_sending());
        assert_eq!(Arc::strong_count(&sink), 3);

        drop(app);
        for _ in 0..200 {
            if Arc::strong_count(&sink) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(Arc::strong_count(&sink), 1, "report task still holds the sink");
    }
}
