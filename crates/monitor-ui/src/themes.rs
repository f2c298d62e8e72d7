use monitor_core::models::ValveState;
use ratatui::style::{Color, Modifier, Style};

/// Terminal background type detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackgroundType {
    Dark,
    Light,
    Unknown,
}

/// Detect terminal background type from the `COLORFGBG` environment variable.
///
/// The variable has the format `"foreground;background"`.  Background values
/// 0–6 are considered dark; 7–15 are considered light.  If the variable is
/// absent or unparseable, `BackgroundType::Dark` is returned.
pub fn detect_background() -> BackgroundType {
    if let Ok(val) = std::env::var("COLORFGBG") {
        if let Some(bg) = val.split(';').next_back() {
            if let Ok(bg_num) = bg.parse::<u8>() {
                return if bg_num <= 6 {
                    BackgroundType::Dark
                } else {
                    BackgroundType::Light
                };
            }
        }
    }
    BackgroundType::Dark
}

/// Every style the dashboard draws with.
#[derive(Debug, Clone)]
pub struct Theme {
    // ── Header ───────────────────────────────────────────────────────────────
    pub header: Style,
    pub header_accent: Style,
    pub separator: Style,

    // ── Text ─────────────────────────────────────────────────────────────────
    pub text: Style,
    pub dim: Style,
    pub bold: Style,
    pub label: Style,
    pub value: Style,
    pub group_title: Style,

    // ── Status ───────────────────────────────────────────────────────────────
    pub info: Style,
    pub success: Style,
    pub warning: Style,
    pub error: Style,

    // ── Table ────────────────────────────────────────────────────────────────
    pub table_header: Style,
    pub table_border: Style,
    pub table_row: Style,
    pub table_row_alt: Style,

    // ── Valves and flags ─────────────────────────────────────────────────────
    pub valve_open: Style,
    pub valve_closed: Style,
    pub valve_unknown: Style,
    pub status_on: Style,
    pub status_off: Style,

    // ── Charts ───────────────────────────────────────────────────────────────
    /// One colour per temperature series, cycled.
    pub series: Vec<Style>,
}

impl Theme {
    // ── Constructors ─────────────────────────────────────────────────────────

    /// Dark-background terminal theme (default).
    pub fn dark() -> Self {
        Self {
            header: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            header_accent: Style::default().fg(Color::LightBlue),
            separator: Style::default().fg(Color::DarkGray),

            text: Style::default().fg(Color::White),
            dim: Style::default().fg(Color::DarkGray),
            bold: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            label: Style::default().fg(Color::Gray),
            value: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            group_title: Style::default()
                .fg(Color::LightBlue)
                .add_modifier(Modifier::BOLD),

            info: Style::default().fg(Color::Cyan),
            success: Style::default().fg(Color::Green),
            warning: Style::default().fg(Color::Yellow),
            error: Style::default().fg(Color::Red),

            table_header: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            table_border: Style::default().fg(Color::DarkGray),
            table_row: Style::default().fg(Color::White),
            table_row_alt: Style::default().fg(Color::Gray),

            valve_open: Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
            valve_closed: Style::default().fg(Color::Red),
            valve_unknown: Style::default().fg(Color::DarkGray),
            status_on: Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
            status_off: Style::default().fg(Color::DarkGray),

            series: vec![
                Style::default().fg(Color::Cyan),
                Style::default().fg(Color::Magenta),
                Style::default().fg(Color::Yellow),
            ],
        }
    }

    /// Light-background terminal theme.
    ///
    /// Dark text with saturated accents so readings stay legible on a white
    /// canvas.
    pub fn light() -> Self {
        Self {
            header: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            header_accent: Style::default().fg(Color::Magenta),
            separator: Style::default().fg(Color::Gray),

            text: Style::default().fg(Color::Black),
            dim: Style::default().fg(Color::Gray),
            bold: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
            label: Style::default().fg(Color::DarkGray),
            value: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
            group_title: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),

            info: Style::default().fg(Color::Blue),
            success: Style::default().fg(Color::Green),
            warning: Style::default().fg(Color::Yellow),
            error: Style::default().fg(Color::Red),

            table_header: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            table_border: Style::default().fg(Color::Gray),
            table_row: Style::default().fg(Color::Black),
            table_row_alt: Style::default().fg(Color::DarkGray),

            valve_open: Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
            valve_closed: Style::default().fg(Color::Red),
            valve_unknown: Style::default().fg(Color::Gray),
            status_on: Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
            status_off: Style::default().fg(Color::Gray),

            series: vec![
                Style::default().fg(Color::Blue),
                Style::default().fg(Color::Magenta),
                Style::default().fg(Color::Red),
            ],
        }
    }

    /// Basic 8-colour ANSI palette without bold modifiers, for minimal
    /// terminal emulators.
    pub fn classic() -> Self {
        Self {
            header: Style::default().fg(Color::White),
            header_accent: Style::default().fg(Color::Yellow),
            separator: Style::default().fg(Color::White),

            text: Style::default().fg(Color::White),
            dim: Style::default().fg(Color::White),
            bold: Style::default().fg(Color::White),
            label: Style::default().fg(Color::White),
            value: Style::default().fg(Color::White),
            group_title: Style::default().fg(Color::Yellow),

            info: Style::default().fg(Color::Cyan),
            success: Style::default().fg(Color::Green),
            warning: Style::default().fg(Color::Yellow),
            error: Style::default().fg(Color::Red),

            table_header: Style::default().fg(Color::Yellow),
            table_border: Style::default().fg(Color::White),
            table_row: Style::default().fg(Color::White),
            table_row_alt: Style::default().fg(Color::White),

            valve_open: Style::default().fg(Color::Green),
            valve_closed: Style::default().fg(Color::Red),
            valve_unknown: Style::default().fg(Color::White),
            status_on: Style::default().fg(Color::Green),
            status_off: Style::default().fg(Color::White),

            series: vec![
                Style::default().fg(Color::Cyan),
                Style::default().fg(Color::Magenta),
                Style::default().fg(Color::Yellow),
            ],
        }
    }

    /// Choose a theme automatically based on the detected terminal background.
    pub fn auto_detect() -> Self {
        match detect_background() {
            BackgroundType::Light => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Construct a theme by name.  Falls back to `auto_detect` for unknown
    /// names.
    pub fn from_name(name: &str) -> Self {
        match name {
            "light" => Self::light(),
            "dark" => Self::dark(),
            "classic" => Self::classic(),
            _ => Self::auto_detect(),
        }
    }

    // ── Style helpers ────────────────────────────────────────────────────────

    pub fn valve_style(&self, state: ValveState) -> Style {
        match state {
            ValveState::Open => self.valve_open,
            ValveState::Closed => self.valve_closed,
            ValveState::Unknown => self.valve_unknown,
        }
    }

    /// `status_on` only when the flag reads exactly 1.
    pub fn status_style(&self, value: Option<f64>) -> Style {
        if value == Some(1.0) {
            self.status_on
        } else {
            self.status_off
        }
    }

    /// Warm-up shows as a warning, cool-down as success.
    pub fn rate_style(&self, rate_per_min: f64) -> Style {
        if rate_per_min > 0.0 {
            self.warning
        } else if rate_per_min < 0.0 {
            self.success
        } else {
            self.text
        }
    }

    /// Colour of the `index`-th chart series.
    pub fn series_style(&self, index: usize) -> Style {
        if self.series.is_empty() {
            return self.text;
        }
        self.series[index % self.series.len()]
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
