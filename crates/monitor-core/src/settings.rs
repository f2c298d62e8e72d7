use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, ValueEnum};

use crate::error::{MonitorError, Result};
use crate::schema::ChannelSchema;
use crate::signal::DEFAULT_SIGNAL_FILE;
use crate::time_utils::{parse_clock_time, parse_iso_date};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Which process to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Interactive terminal dashboard.
    Dashboard,
    /// Background file watcher and daily reporter.
    Scheduler,
    /// Build one report, print it and optionally send it.
    Report,
}

/// Cryogenic refrigerator log monitor
#[derive(Parser, Debug, Clone)]
#[command(
    name = "dspx-monitor",
    about = "Dashboard, file watcher and daily reporter for Dspx refrigerator logs",
    version
)]
pub struct Settings {
    /// What to run
    #[arg(long, value_enum, default_value = "dashboard")]
    pub mode: Mode,

    /// Directory holding the MMDDYY.txt log files
    #[arg(long, env = "DSPX_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// First day of the range to show (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,

    /// Last day of the range to show (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<String>,

    /// Length of the trailing window in hours
    #[arg(long, default_value = "24", value_parser = clap::value_parser!(u32).range(1..=720))]
    pub hours: u32,

    /// Seconds between data file checks in scheduler mode
    #[arg(long, default_value = "60", value_parser = clap::value_parser!(u64).range(1..))]
    pub check_interval: u64,

    /// Local time of the daily report (HH:MM)
    #[arg(long, default_value = "15:00")]
    pub report_time: String,

    /// Slack channel receiving reports
    #[arg(long, env = "SLACK_REPORT_CHANNEL")]
    pub report_channel: Option<String>,

    /// Slack user receiving reports by direct message
    #[arg(long, env = "SLACK_REPORT_USER")]
    pub report_user: Option<String>,

    /// KEY=VALUE file with Slack credentials
    #[arg(long, default_value = "slack.secret")]
    pub secrets_file: PathBuf,

    /// File used to signal fresh data to the dashboard
    #[arg(long, default_value = DEFAULT_SIGNAL_FILE)]
    pub signal_file: PathBuf,

    /// JSON channel schema replacing the built-in Dspx layout
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Seconds a parsed data file stays cached
    #[arg(long, default_value = "300")]
    pub cache_ttl: u64,

    /// Display theme
    #[arg(long, default_value = "auto", value_parser = ["light", "dark", "classic", "auto"])]
    pub theme: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// In report mode, deliver the report instead of only printing it
    #[arg(long)]
    pub send: bool,
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments and apply `--debug`.
    pub fn from_args() -> Self {
        Self::parse().resolved()
    }

    /// Same as [`from_args`](Self::from_args) over an explicit argument list,
    /// enabling unit-testing without spawning subprocesses.
    pub fn try_from_args(args: Vec<OsString>) -> std::result::Result<Self, clap::Error> {
        Self::try_parse_from(args).map(Self::resolved)
    }

    fn resolved(mut self) -> Self {
        if self.debug {
            self.log_level = "DEBUG".to_string();
        }
        self
    }

    pub fn report_time(&self) -> Result<NaiveTime> {
        parse_clock_time(&self.report_time)
    }

    /// Explicit day range, or `None` for the trailing window.
    ///
    /// A single bound selects that one day.
    pub fn date_range(&self) -> Result<Option<(NaiveDate, NaiveDate)>> {
        let start = self.start.as_deref().map(parse_iso_date).transpose()?;
        let end = self.end.as_deref().map(parse_iso_date).transpose()?;
        let range = match (start, end) {
            (None, None) => return Ok(None),
            (Some(s), None) => (s, s),
            (None, Some(e)) => (e, e),
            (Some(s), Some(e)) => (s, e),
        };
        if range.0 > range.1 {
            return Err(MonitorError::Config(format!(
                "start date {} is after end date {}",
                range.0, range.1
            )));
        }
        Ok(Some(range))
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    /// The configured schema file, or the built-in Dspx layout.
    pub fn load_schema(&self) -> Result<ChannelSchema> {
        match &self.schema {
            Some(path) => ChannelSchema::load_from(path),
            None => Ok(ChannelSchema::dspx()),
        }
    }

    /// Resolve credentials and report destination once, at startup.
    pub fn messaging_config(&self) -> Result<MessagingConfig> {
        let secrets = Secrets::load(&self.secrets_file);
        MessagingConfig::resolve(
            &secrets,
            self.report_channel.as_deref(),
            self.report_user.as_deref(),
        )
    }
}

// ── Secrets ────────────────────────────────────────────────────────────────────

pub const SLACK_BOT_TOKEN: &str = "SLACK_BOT_TOKEN";
pub const SLACK_APP_TOKEN: &str = "SLACK_APP_TOKEN";
pub const SLACK_SIGNING_SECRET: &str = "SLACK_SIGNING_SECRET";

const ENV_KEYS: [&str; 3] = [SLACK_BOT_TOKEN, SLACK_APP_TOKEN, SLACK_SIGNING_SECRET];

/// Where a secret value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource {
    Environment,
    File,
}

/// Credentials from the environment, then a `KEY=VALUE` file.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    values: HashMap<String, (String, SecretSource)>,
}

impl Secrets {
    /// Load from the process environment and `path`.
    ///
    /// A missing or unreadable file leaves only the environment values.
    pub fn load(path: &Path) -> Self {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Load with an explicit environment lookup.
    pub fn load_with(path: &Path, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut values = HashMap::new();
        for key in ENV_KEYS {
            if let Some(v) = env(key).filter(|v| !v.trim().is_empty()) {
                values.insert(key.to_string(), (v, SecretSource::Environment));
            }
        }

        match std::fs::read_to_string(path) {
            Ok(content) => {
                for (key, value) in parse_secret_lines(&content) {
                    values
                        .entry(key)
                        .or_insert((value, SecretSource::File));
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no secrets file");
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "failed to read secrets file");
            }
        }

        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|(v, _)| v.as_str())
    }

    pub fn source(&self, key: &str) -> Option<SecretSource> {
        self.values.get(key).map(|(_, s)| *s)
    }
}

fn parse_secret_lines(content: &str) -> impl Iterator<Item = (String, String)> + '_ {
    content.lines().filter_map(|line| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let (key, value) = line.split_once('=')?;
        let key = key.trim();
        let value = value.trim().trim_matches('"');
        if key.is_empty() || value.is_empty() {
            return None;
        }
        Some((key.to_string(), value.to_string()))
    })
}

// ── MessagingConfig ────────────────────────────────────────────────────────────

/// Where reports go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportTarget {
    Channel(String),
    User(String),
}

/// Everything the messaging client needs, resolved once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagingConfig {
    pub bot_token: String,
    pub target: ReportTarget,
}

impl MessagingConfig {
    /// A channel wins over a user; neither, or no bot token, is an error.
    pub fn resolve(secrets: &Secrets, channel: Option<&str>, user: Option<&str>) -> Result<Self> {
        let bot_token = secrets
            .get(SLACK_BOT_TOKEN)
            .ok_or_else(|| MonitorError::Config(format!("{SLACK_BOT_TOKEN} is not set")))?
            .to_string();

        fn non_empty(s: Option<&str>) -> Option<&str> {
            s.map(str::trim).filter(|s| !s.is_empty())
        }
        let target = match (non_empty(channel), non_empty(user)) {
            (Some(c), _) => ReportTarget::Channel(c.to_string()),
            (None, Some(u)) => ReportTarget::User(u.to_string()),
            (None, None) => {
                return Err(MonitorError::Config(
                    "no report destination: set --report-channel or --report-user".into(),
                ))
            }
        };

        Ok(Self { bot_token, target })
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(list: &[&str]) -> Vec<OsString> {
        std::iter::once("dspx-monitor")
            .chain(list.iter().copied())
            .map(OsString::from)
            .collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let s = Settings::try_from_args(args(&["--data-dir", "logs"])).unwrap();
        assert_eq!(s.mode, Mode::Dashboard);
        assert_eq!(s.data_dir, PathBuf::from("logs"));
        assert_eq!(s.hours, 24);
        assert_eq!(s.check_interval(), Duration::from_secs(60));
        assert_eq!(s.cache_ttl(), Duration::from_secs(300));
        assert_eq!(s.report_time().unwrap(), NaiveTime::from_hms_opt(15, 0, 0).unwrap());
        assert_eq!(s.signal_file, PathBuf::from(".refresh_signal"));
        assert!(!s.send);
        assert_eq!(s.date_range().unwrap(), None);
    }

    #[test]
    fn test_mode_and_debug() {
        let s = Settings::try_from_args(args(&["--mode", "scheduler", "--debug"])).unwrap();
        assert_eq!(s.mode, Mode::Scheduler);
        assert_eq!(s.log_level, "DEBUG");
    }

    #[test]
    fn test_invalid_mode_rejected() {
        assert!(Settings::try_from_args(args(&["--mode", "nope"])).is_err());
    }

    #[test]
    fn test_zero_check_interval_rejected() {
        assert!(Settings::try_from_args(args(&["--check-interval", "0"])).is_err());
    }

    #[test]
    fn test_date_range_variants() {
        let d = |s: &str| parse_iso_date(s).unwrap();

        let s = Settings::try_from_args(args(&["--start", "2024-01-01", "--end", "2024-01-03"]))
            .unwrap();
        assert_eq!(s.date_range().unwrap(), Some((d("2024-01-01"), d("2024-01-03"))));

        let s = Settings::try_from_args(args(&["--start", "2024-01-02"])).unwrap();
        assert_eq!(s.date_range().unwrap(), Some((d("2024-01-02"), d("2024-01-02"))));

        let s = Settings::try_from_args(args(&["--start", "2024-01-05", "--end", "2024-01-01"]))
            .unwrap();
        assert!(matches!(s.date_range(), Err(MonitorError::Config(_))));

        let s = Settings::try_from_args(args(&["--end", "01/02/2024"])).unwrap();
        assert!(s.date_range().is_err());
    }

    #[test]
    fn test_bad_report_time() {
        let s = Settings::try_from_args(args(&["--report-time", "25:00"])).unwrap();
        assert!(s.report_time().is_err());
    }

    #[test]
    fn test_load_schema_default_is_dspx() {
        let s = Settings::try_from_args(args(&[])).unwrap();
        assert_eq!(s.load_schema().unwrap(), ChannelSchema::dspx());
    }

    #[test]
    fn test_secrets_env_wins_over_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("slack.secret");
        std::fs::write(
            &path,
            "# credentials\nSLACK_BOT_TOKEN=xoxb-file\nSLACK_APP_TOKEN = xapp-file\n\nbroken line\n",
        )
        .unwrap();

        let secrets = Secrets::load_with(&path, |key| {
            (key == SLACK_BOT_TOKEN).then(|| "xoxb-env".to_string())
        });

        assert_eq!(secrets.get(SLACK_BOT_TOKEN), Some("xoxb-env"));
        assert_eq!(secrets.source(SLACK_BOT_TOKEN), Some(SecretSource::Environment));
        assert_eq!(secrets.get(SLACK_APP_TOKEN), Some("xapp-file"));
        assert_eq!(secrets.source(SLACK_APP_TOKEN), Some(SecretSource::File));
        assert_eq!(secrets.get(SLACK_SIGNING_SECRET), None);
    }

    #[test]
    fn test_secrets_missing_file() {
        let secrets = Secrets::load_with(Path::new("/tmp/no-such-secret-xyz"), no_env);
        assert_eq!(secrets.get(SLACK_BOT_TOKEN), None);
    }

    #[test]
    fn test_messaging_config_channel_precedence() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("slack.secret");
        std::fs::write(&path, "SLACK_BOT_TOKEN=xoxb-1\n").unwrap();
        let secrets = Secrets::load_with(&path, no_env);

        let cfg = MessagingConfig::resolve(&secrets, Some("#fridge"), Some("U123")).unwrap();
        assert_eq!(cfg.target, ReportTarget::Channel("#fridge".into()));
        assert_eq!(cfg.bot_token, "xoxb-1");

        let cfg = MessagingConfig::resolve(&secrets, Some("  "), Some("U123")).unwrap();
        assert_eq!(cfg.target, ReportTarget::User("U123".into()));

        assert!(MessagingConfig::resolve(&secrets, None, None).is_err());
    }

    #[test]
    fn test_messaging_config_trims_destination() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("slack.secret");
        std::fs::write(&path, "SLACK_BOT_TOKEN=xoxb-2\n").unwrap();
        let secrets = Secrets::load_with(&path, no_env);

        let cfg = MessagingConfig::resolve(&secrets, Some("  #fridge \t"), None).unwrap();
        assert_eq!(cfg.target, ReportTarget::Channel("#fridge".into()));

        let cfg = MessagingConfig::resolve(&secrets, None, Some(" U42 ")).unwrap();
        assert_eq!(cfg.target, ReportTarget::User("U42".into()));

        assert!(MessagingConfig::resolve(&secrets, Some(""), Some("   ")).is_err());
    }

    #[test]
    fn test_messaging_config_requires_token() {
        let secrets = Secrets::default();
        let err = MessagingConfig::resolve(&secrets, Some("#fridge"), None).unwrap_err();
        assert!(err.to_string().contains(SLACK_BOT_TOKEN));
    }
}
