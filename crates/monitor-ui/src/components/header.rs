use crate::themes::Theme;
use ratatui::text::{Line, Span};

/// Decoration placed either side of the application title.
pub const SNOWFLAKES: &str = "❄ ❅ ❄";

/// Dashboard header rendering four lines:
///
/// 1. Application title with decorations.
/// 2. A 60-column `=` separator.
/// 3. `[ range | N files | N rows ]`.
/// 4. An empty line.
pub struct Header<'a> {
    /// `"Last 24 hours"`, a date, or `"<start> to <end>"`.
    pub label: &'a str,
    pub files: usize,
    pub rows: usize,
    pub theme: &'a Theme,
}

impl<'a> Header<'a> {
    pub fn new(label: &'a str, files: usize, rows: usize, theme: &'a Theme) -> Self {
        Self {
            label,
            files,
            rows,
            theme,
        }
    }

    /// Render the header as exactly four lines.
    pub fn to_lines(&self) -> Vec<Line<'a>> {
        let separator = "=".repeat(60);

        vec![
            Line::from(vec![
                Span::styled(SNOWFLAKES, self.theme.header_accent),
                Span::styled(" DSPX FRIDGE MONITOR ", self.theme.header),
                Span::styled(SNOWFLAKES, self.theme.header_accent),
            ]),
            Line::from(Span::styled(separator, self.theme.separator)),
            Line::from(vec![
                Span::styled("[ ", self.theme.label),
                Span::styled(self.label.to_string(), self.theme.value),
                Span::styled(" | ", self.theme.label),
                Span::styled(plural(self.files, "file"), self.theme.value),
                Span::styled(" | ", self.theme.label),
                Span::styled(plural(self.rows, "row"), self.theme.value),
                Span::styled(" ]", self.theme.label),
            ]),
            Line::from(""),
        ]
    }
}

fn plural(n: usize, noun: &str) -> String {
    let count = monitor_core::formatting::format_count(n);
    if n == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
