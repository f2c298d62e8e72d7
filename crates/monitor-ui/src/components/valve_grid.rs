use crate::themes::Theme;
use monitor_core::models::ValveState;
use ratatui::text::{Line, Span};

/// Valves per grid row.
pub const VALVES_PER_ROW: usize = 8;

/// Width of the name column inside one grid cell.
const NAME_WIDTH: usize = 5;

/// Latest valve states laid out in rows of [`VALVES_PER_ROW`], each cell
/// reading `"VE12 [O]"`.
pub struct ValveGrid<'a> {
    pub states: &'a [(String, ValveState)],
    pub theme: &'a Theme,
}

impl<'a> ValveGrid<'a> {
    pub fn new(states: &'a [(String, ValveState)], theme: &'a Theme) -> Self {
        Self { states, theme }
    }

    pub fn to_lines(&self) -> Vec<Line<'a>> {
        self.states
            .chunks(VALVES_PER_ROW)
            .map(|chunk| {
                let mut spans = Vec::with_capacity(chunk.len() * 3);
                for (i, (name, state)) in chunk.iter().enumerate() {
                    if i > 0 {
                        spans.push(Span::raw("  "));
                    }
                    spans.push(Span::styled(
                        format!("{:<width$}", name, width = NAME_WIDTH),
                        self.theme.label,
                    ));
                    spans.push(Span::styled(state.marker(), self.theme.valve_style(*state)));
                }
                Line::from(spans)
            })
            .collect()
    }

    /// `"12 open, 10 closed, 1 unknown"`.
    pub fn tally(&self) -> String {
        let count = |wanted: ValveState| self.states.iter().filter(|(_, s)| *s == wanted).count();
        format!(
            "{} open, {} closed, {} unknown",
            count(ValveState::Open),
            count(ValveState::Closed),
            count(ValveState::Unknown)
        )
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn states(n: usize) -> Vec<(String, ValveState)> {
        (1..=n)
            .map(|i| {
                let state = match i % 3 {
                    0 => ValveState::Unknown,
                    1 => ValveState::Open,
                    _ => ValveState::Closed,
                };
                (format!("VE{i}"), state)
            })
            .collect()
    }

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_rows_of_eight() {
        let theme = Theme::dark();
        let states = states(23);
        let lines = ValveGrid::new(&states, &theme).to_lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(text(&lines[0]).matches('[').count(), 8);
        assert_eq!(text(&lines[2]).matches('[').count(), 7);
    }

    #[test]
    fn test_cell_text_and_style() {
        let theme = Theme::dark();
        let states = vec![
            ("VE1".to_string(), ValveState::Open),
            ("VE12".to_string(), ValveState::Closed),
        ];
        let lines = ValveGrid::new(&states, &theme).to_lines();
        assert_eq!(text(&lines[0]), "VE1  [O]  VE12 [X]");
        assert_eq!(lines[0].spans[1].style, theme.valve_open);
        assert_eq!(lines[0].spans[4].style, theme.valve_closed);
    }

    #[test]
    fn test_empty_grid() {
        let theme = Theme::dark();
        let grid = ValveGrid::new(&[], &theme);
        assert!(grid.to_lines().is_empty());
        assert_eq!(grid.tally(), "0 open, 0 closed, 0 unknown");
    }

    #[test]
    fn test_tally() {
        let theme = Theme::dark();
        let states = states(6);
        assert_eq!(
            ValveGrid::new(&states, &theme).tally(),
            "2 open, 2 closed, 2 unknown"
        );
    }
}
