//! The single dashboard view.
//!
//! [`build_state`] turns whatever the data manager returns into a
//! [`DashboardState`] that owns plain strings and numbers; the render
//! functions only draw it. Keeping the two apart lets tests check content
//! without a terminal.

use chrono::{NaiveDate, NaiveDateTime};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Paragraph, Row, Sparkline, Table},
    Frame,
};

use monitor_core::error::MonitorError;
use monitor_core::formatting::{self, format_fixed, format_reading};
use monitor_core::models::{Dataset, ValveState};
use monitor_core::schema::{Channel, ChannelKind, ChannelSchema};
use monitor_data::statistics::{latest_valve_states, latest_value, summarize};
use monitor_data::window::{downsample, DEFAULT_CHART_POINTS};
use monitor_runtime::data_manager::{DataManager, LoadedData};

use crate::components::header::Header;
use crate::components::valve_grid::ValveGrid;
use crate::themes::Theme;

pub const NO_FILES_MESSAGE: &str = "No data files found for selected date range";
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load data files";

/// Height of the sparkline bars, in percent of the series span.
const SPARK_SCALE: f64 = 100.0;

/// Rows per chart: group title, series title, three rows of bars.
const CHART_HEIGHT: u16 = 5;

pub const VALVE_CHART_TITLE: &str = "Valves";

// ── Snapshot ──────────────────────────────────────────────────────────────────

/// One formatted reading in a channel group.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub label: String,
    pub text: String,
    pub kind: ChannelKind,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupReadings {
    pub title: String,
    pub readings: Vec<Reading>,
}

/// A row of the statistics table.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsRow {
    pub alias: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub current: Option<f64>,
    pub rate_per_min: f64,
}

/// A trace scaled for a sparkline.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    /// Drives how `min` and `max` are printed; `None` prints whole numbers.
    pub kind: Option<ChannelKind>,
    /// `0..=100`, relative to the series span; missing samples are skipped.
    pub points: Vec<u64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Series {
    fn bounds(&self) -> (String, String) {
        match self.kind {
            Some(kind) => (format_reading(kind, self.min), format_reading(kind, self.max)),
            None => (format_fixed(self.min, 0), format_fixed(self.max, 0)),
        }
    }
}

/// The traces of one channel group, drawn side by side.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub title: String,
    pub series: Vec<Series>,
}

/// Everything the dashboard draws for a loaded dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub label: String,
    pub files: usize,
    pub rows: usize,
    pub columns: usize,
    /// First and last time label of the dataset.
    pub span: Option<(String, String)>,
    pub groups: Vec<GroupReadings>,
    pub stats: Vec<StatsRow>,
    pub valves: Vec<(String, ValveState)>,
    /// One chart per channel group with data, then the valve timeline.
    pub charts: Vec<Chart>,
}

/// What the dashboard currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardState {
    /// Nothing loaded yet.
    Loading,
    Ready(Snapshot),
    /// A plain message with an optional detail line.
    Message { text: String, detail: Option<String> },
}

/// Load the view's data and build its state. Errors become plain messages.
pub fn build_state(
    manager: &DataManager,
    schema: &ChannelSchema,
    range: Option<(NaiveDate, NaiveDate)>,
    hours: u32,
    now: NaiveDateTime,
) -> DashboardState {
    let label = monitor_data::report::label_for_range(range, hours);
    match manager.load(range, hours, now) {
        Ok(loaded) => DashboardState::Ready(build_snapshot(&loaded, schema, label)),
        Err(MonitorError::NoDataFiles(dir)) => {
            tracing::info!("No data files in {} for {}", dir.display(), label);
            DashboardState::Message {
                text: NO_FILES_MESSAGE.to_string(),
                detail: Some(label),
            }
        }
        Err(e) => {
            tracing::warn!("Dashboard load failed: {}", e);
            DashboardState::Message {
                text: LOAD_FAILED_MESSAGE.to_string(),
                detail: Some(e.to_string()),
            }
        }
    }
}

/// Pure projection of a loaded dataset onto the dashboard.
pub fn build_snapshot(loaded: &LoadedData, schema: &ChannelSchema, label: String) -> Snapshot {
    let dataset = &loaded.dataset;

    let span = match (dataset.time_label(0), dataset.len().checked_sub(1)) {
        (Some(first), Some(last)) => dataset
            .time_label(last)
            .map(|l| (first.to_string(), l.to_string())),
        _ => None,
    };

    let groups = schema
        .groups
        .iter()
        .map(|group| GroupReadings {
            title: group.title.clone(),
            readings: group
                .channels
                .iter()
                .filter(|c| dataset.has_column(&c.name))
                .map(|c| {
                    let value = latest_value(dataset, &c.name);
                    Reading {
                        label: c.alias.clone(),
                        text: format_reading(c.kind, value),
                        kind: c.kind,
                        value,
                    }
                })
                .collect(),
        })
        .filter(|g| !g.readings.is_empty())
        .collect();

    let stats = summarize(dataset, &schema.report_channels)
        .iter()
        .map(|(name, s)| StatsRow {
            alias: schema.alias(name).to_string(),
            min: s.min,
            max: s.max,
            current: s.current,
            rate_per_min: s.avg_rate_per_min,
        })
        .collect();

    let sampled = downsample(dataset, DEFAULT_CHART_POINTS);
    let mut charts: Vec<Chart> = schema
        .groups
        .iter()
        .map(|group| Chart {
            title: group.title.clone(),
            series: group
                .channels
                .iter()
                .filter(|c| c.kind != ChannelKind::Status)
                .filter_map(|c| series_for(&sampled, c))
                .collect(),
        })
        .filter(|c| !c.series.is_empty())
        .collect();
    if let Some(timeline) = valve_timeline(&sampled, schema) {
        charts.push(Chart {
            title: VALVE_CHART_TITLE.to_string(),
            series: vec![timeline],
        });
    }

    Snapshot {
        label,
        files: loaded.files.len(),
        rows: dataset.len(),
        columns: dataset.columns().len(),
        span,
        groups,
        stats,
        valves: latest_valve_states(dataset, schema),
        charts,
    }
}

fn series_for(dataset: &Dataset, channel: &Channel) -> Option<Series> {
    let values: Vec<f64> = dataset
        .numeric_column(&channel.name)?
        .into_iter()
        .flatten()
        .collect();
    Some(scaled(channel.alias.clone(), Some(channel.kind), &values))
}

/// Number of open valves per sample, over the valve columns present.
fn valve_timeline(dataset: &Dataset, schema: &ChannelSchema) -> Option<Series> {
    let names: Vec<&str> = schema
        .valves
        .iter()
        .map(|v| v.name.as_str())
        .filter(|name| dataset.has_column(name))
        .collect();
    if names.is_empty() {
        return None;
    }
    let counts: Vec<f64> = (0..dataset.len())
        .map(|row| {
            names
                .iter()
                .filter(|name| ValveState::from_cell(dataset.value(row, name)) == ValveState::Open)
                .count() as f64
        })
        .collect();
    Some(scaled("Open valves".to_string(), None, &counts))
}

fn scaled(label: String, kind: Option<ChannelKind>, values: &[f64]) -> Series {
    let min = values.iter().copied().reduce(f64::min);
    let max = values.iter().copied().reduce(f64::max);
    let points = match (min, max) {
        (Some(lo), Some(hi)) if hi > lo => values
            .iter()
            .map(|v| ((v - lo) / (hi - lo) * SPARK_SCALE).round() as u64)
            .collect(),
        // Flat trace: draw a mid-height line.
        _ => vec![(SPARK_SCALE / 2.0) as u64; values.len()],
    };
    Series {
        label,
        kind,
        points,
        min,
        max,
    }
}

// ── Lines ─────────────────────────────────────────────────────────────────────

/// `"Data range: 2024-01-01 00:00:00 to 2024-01-02 09:00:00 (2 files, 1,234 rows, 40 columns)"`.
pub fn info_line<'a>(snapshot: &Snapshot, theme: &'a Theme) -> Line<'a> {
    let range = match &snapshot.span {
        Some((first, last)) => format!("{first} to {last}"),
        None => "no rows in window".to_string(),
    };
    Line::from(vec![
        Span::styled("Data range: ", theme.label),
        Span::styled(range, theme.value),
        Span::styled(
            format!(
                " ({} files, {} rows, {} columns)",
                snapshot.files,
                formatting::format_count(snapshot.rows),
                snapshot.columns
            ),
            theme.dim,
        ),
    ])
}

/// Channel groups with their latest values, one reading per line.
pub fn reading_lines<'a>(snapshot: &Snapshot, theme: &'a Theme) -> Vec<Line<'a>> {
    let mut lines = Vec::new();
    for group in &snapshot.groups {
        lines.push(Line::from(Span::styled(group.title.clone(), theme.group_title)));
        for reading in &group.readings {
            let style = if reading.kind == ChannelKind::Status {
                theme.status_style(reading.value)
            } else {
                theme.value
            };
            lines.push(Line::from(vec![
                Span::styled(format!("  {:<22}", reading.label), theme.label),
                Span::styled(reading.text.clone(), style),
            ]));
        }
        lines.push(Line::from(""));
    }
    lines
}

// ── Rendering ─────────────────────────────────────────────────────────────────

/// Draw the whole dashboard into `area`.
pub fn render_dashboard(
    frame: &mut Frame,
    area: Rect,
    state: &DashboardState,
    status: Option<&str>,
    theme: &Theme,
) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);

    match state {
        DashboardState::Ready(snapshot) => render_snapshot(frame, outer[0], snapshot, theme),
        DashboardState::Loading => render_message(frame, outer[0], "Loading data…", None, theme),
        DashboardState::Message { text, detail } => {
            render_message(frame, outer[0], text, detail.as_deref(), theme)
        }
    }

    frame.render_widget(Paragraph::new(footer_line(status, theme)), outer[1]);
}

fn footer_line<'a>(status: Option<&str>, theme: &'a Theme) -> Line<'a> {
    let mut spans = vec![Span::styled(
        "r: refresh  s: send report  q: quit",
        theme.dim,
    )];
    if let Some(status) = status {
        spans.push(Span::styled("  │  ", theme.separator));
        spans.push(Span::styled(status.to_string(), theme.info));
    }
    Line::from(spans)
}

fn render_snapshot(frame: &mut Frame, area: Rect, snapshot: &Snapshot, theme: &Theme) {
    let header = Header::new(&snapshot.label, snapshot.files, snapshot.rows, theme);
    let chart_height = (snapshot.charts.len() as u16).saturating_mul(CHART_HEIGHT);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(chart_height),
        ])
        .split(area);

    frame.render_widget(Paragraph::new(Text::from(header.to_lines())), rows[0]);
    frame.render_widget(Paragraph::new(info_line(snapshot, theme)), rows[1]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(rows[2]);

    frame.render_widget(
        Paragraph::new(Text::from(reading_lines(snapshot, theme))).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(" Latest readings "),
        ),
        columns[0],
    );

    let valve_rows = snapshot.valves.len().div_ceil(crate::components::valve_grid::VALVES_PER_ROW);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(snapshot.stats.len() as u16 + 3),
            Constraint::Min(valve_rows as u16 + 3),
        ])
        .split(columns[1]);

    render_stats_table(frame, right[0], &snapshot.stats, theme);
    render_valves(frame, right[1], &snapshot.valves, theme);
    render_charts(frame, rows[3], &snapshot.charts, theme);
}

/// Min, max, current and average rate of the report channels.
pub fn render_stats_table(frame: &mut Frame, area: Rect, stats: &[StatsRow], theme: &Theme) {
    let header = Row::new(
        ["Channel", "Min", "Max", "Current", "Rate (/min)"]
            .iter()
            .map(|h| Cell::from(*h).style(theme.table_header)),
    );

    let rows: Vec<Row> = stats
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let style = if i % 2 == 0 {
                theme.table_row
            } else {
                theme.table_row_alt
            };
            Row::new(vec![
                Cell::from(s.alias.clone()),
                Cell::from(format_fixed(s.min, 6)),
                Cell::from(format_fixed(s.max, 6)),
                Cell::from(format_fixed(s.current, 6)),
                Cell::from(format!("{:.8}", s.rate_per_min)).style(theme.rate_style(s.rate_per_min)),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(12),
        Constraint::Length(11),
        Constraint::Length(11),
        Constraint::Length(11),
        Constraint::Length(13),
    ];

    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.table_border)
            .title(" Statistics "),
    );
    frame.render_widget(table, area);
}

fn render_valves(frame: &mut Frame, area: Rect, valves: &[(String, ValveState)], theme: &Theme) {
    let grid = ValveGrid::new(valves, theme);
    let mut lines = grid.to_lines();
    lines.push(Line::from(Span::styled(grid.tally(), theme.dim)));
    frame.render_widget(
        Paragraph::new(Text::from(lines)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(" Valves "),
        ),
        area,
    );
}

fn render_charts(frame: &mut Frame, area: Rect, charts: &[Chart], theme: &Theme) {
    if charts.is_empty() {
        return;
    }
    let slots = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(CHART_HEIGHT); charts.len()])
        .split(area);

    let mut colour = 0;
    for (chart, slot) in charts.iter().zip(slots.iter()) {
        let block = Block::default()
            .borders(Borders::TOP)
            .border_style(theme.table_border)
            .title(Span::styled(format!(" {} ", chart.title), theme.group_title));
        let inner = block.inner(*slot);
        frame.render_widget(block, *slot);

        let n = chart.series.len() as u32;
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, n); chart.series.len()])
            .split(inner);

        for (s, cell) in chart.series.iter().zip(cells.iter()) {
            let (min, max) = s.bounds();
            let spark = Sparkline::default()
                .block(
                    Block::default()
                        .borders(Borders::TOP)
                        .title(format!(" {}  {min} .. {max} ", s.label)),
                )
                .data(s.points.iter().copied())
                .max(SPARK_SCALE as u64)
                .style(theme.series_style(colour));
            frame.render_widget(spark, *cell);
            colour += 1;
        }
    }
}

/// Render a plain message inside a bordered block.
pub fn render_message(
    frame: &mut Frame,
    area: Rect,
    text: &str,
    detail: Option<&str>,
    theme: &Theme,
) {
    let mut lines = vec![Line::from(""), Line::from(Span::styled(text.to_string(), theme.warning))];
    if let Some(detail) = detail {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(detail.to_string(), theme.dim)));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Press 'r' to retry or 'q' to exit", theme.dim)));

    frame.render_widget(
        Paragraph::new(Text::from(lines)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Dspx Monitor "),
        ),
        area,
    );
}

// ── Tests ─────────────────────────────────────────────────────────────────────
