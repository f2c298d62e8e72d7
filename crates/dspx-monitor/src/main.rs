mod bootstrap;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Local;
use monitor_core::schema::ChannelSchema;
use monitor_core::settings::{Mode, Settings};
use monitor_core::signal::{PollPolicy, RefreshSignal};
use monitor_runtime::data_manager::DataManager;
use monitor_runtime::messaging::{ReportSink, SlackClient};
use monitor_runtime::scheduler::{ScheduleConfig, Scheduler};
use monitor_ui::app::{App, DashboardConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_args();

    let base = bootstrap::monitor_dir();
    bootstrap::ensure_directories(&base)?;
    let log_file = bootstrap::log_file_for(&base, settings.mode, settings.log_file.as_deref());
    bootstrap::setup_logging(
        &settings.log_level,
        &log_file,
        settings.mode != Mode::Dashboard,
    )?;

    tracing::info!(
        "Dspx-Monitor v{} starting in {} mode",
        env!("CARGO_PKG_VERSION"),
        bootstrap::mode_name(settings.mode)
    );
    tracing::info!("Data directory: {}", settings.data_dir.display());

    let schema = Arc::new(settings.load_schema().context("loading channel schema")?);
    let manager = Arc::new(DataManager::new(
        settings.data_dir.clone(),
        &schema.time_column,
        settings.cache_ttl(),
    ));
    let signal = RefreshSignal::new(settings.signal_file.clone());
    let messenger = messenger(&settings);

    match settings.mode {
        Mode::Dashboard => run_dashboard(&settings, manager, schema, signal, messenger).await,
        Mode::Scheduler => run_scheduler(&settings, manager, schema, signal, messenger).await,
        Mode::Report => run_report(&settings, &manager, &schema, messenger).await,
    }
}

/// The Slack client, or `None` with a warning when credentials or the
/// destination are missing.
fn messenger(settings: &Settings) -> Option<Arc<SlackClient>> {
    match settings.messaging_config() {
        Ok(config) => {
            tracing::info!("Reports go to {:?}", config.target);
            Some(Arc::new(SlackClient::new(config)))
        }
        Err(e) => {
            tracing::warn!("{}; reports will not be sent", e);
            None
        }
    }
}

async fn run_dashboard(
    settings: &Settings,
    manager: Arc<DataManager>,
    schema: Arc<ChannelSchema>,
    signal: RefreshSignal,
    messenger: Option<Arc<SlackClient>>,
) -> Result<()> {
    let config = DashboardConfig {
        range: settings.date_range()?,
        hours: settings.hours,
        policy: PollPolicy::default(),
    };
    let app = App::new(&settings.theme, manager, schema, signal, messenger, config);

    // The loop exits on 'q' / Ctrl+C inside the TUI; the OS-level handler
    // covers signals that arrive outside raw mode. Dropping the run future
    // restores the terminal.
    tokio::select! {
        result = app.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl+C received; closing dashboard");
        }
    }
    Ok(())
}

async fn run_scheduler(
    settings: &Settings,
    manager: Arc<DataManager>,
    schema: Arc<ChannelSchema>,
    signal: RefreshSignal,
    messenger: Option<Arc<SlackClient>>,
) -> Result<()> {
    let config = ScheduleConfig {
        check_interval: settings.check_interval(),
        report_time: settings.report_time()?,
        hours: settings.hours,
    };
    let handle = Scheduler::new(manager, schema, signal, messenger, config).start();

    tracing::info!("Scheduler running; press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!("Ctrl+C received; stopping scheduler");
    handle.abort();
    Ok(())
}

async fn run_report(
    settings: &Settings,
    manager: &DataManager,
    schema: &ChannelSchema,
    messenger: Option<Arc<SlackClient>>,
) -> Result<()> {
    let range = settings.date_range()?;
    let now = Local::now().naive_local();
    let report = manager.build_report(schema, range, settings.hours, now)?;

    println!("{}", report.to_text());

    if !settings.send {
        return Ok(());
    }
    let Some(client) = messenger else {
        bail!("Messaging is not configured; report not sent");
    };
    let delivery = client.deliver(&report).await;
    if !delivery.success {
        bail!("{}", delivery.message);
    }
    println!("{}", delivery.message);
    Ok(())
}
