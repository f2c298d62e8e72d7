use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use monitor_core::settings::Mode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// `~/.dspx-monitor`, or `./.dspx-monitor` without a home directory.
pub fn monitor_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".dspx-monitor")
}

/// Create `<base>/` and `<base>/logs/` if absent.
pub fn ensure_directories(base: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(base)?;
    std::fs::create_dir_all(base.join("logs"))?;
    Ok(())
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

pub fn mode_name(mode: Mode) -> &'static str {
    match mode {
        Mode::Dashboard => "dashboard",
        Mode::Scheduler => "scheduler",
        Mode::Report => "report",
    }
}

/// `--log-file` when given, else `<base>/logs/<mode>.log`.
pub fn log_file_for(base: &Path, mode: Mode, explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => base.join("logs").join(format!("{}.log", mode_name(mode))),
    }
}

/// Map a `--log-level` name to an `EnvFilter` directive.
///
/// Unknown names pass through so `RUST_LOG`-style directives also work.
pub fn filter_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_string(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Everything goes to `log_file` (appended, no colours). With `to_stderr`
/// the same events are also written to stderr; the dashboard never sets it
/// since it owns the terminal.
pub fn setup_logging(log_level: &str, log_file: &Path, to_stderr: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(filter_directive(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file));

    let stderr_layer = to_stderr.then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;

    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
