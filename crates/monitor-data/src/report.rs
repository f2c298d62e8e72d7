//! Summary report payload and its text and Block Kit renderings.

use chrono::{NaiveDate, NaiveDateTime};
use monitor_core::formatting::format_fixed;
use monitor_core::schema::ChannelSchema;
use monitor_core::time_utils::{iso_date, DATETIME_FORMAT};
use serde::Serialize;
use serde_json::{json, Value};

use crate::statistics::Summary;

pub const REPORT_TITLE: &str = "🌡️ Dspx-Monitor Daily Report";

/// One channel's line in a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportChannel {
    pub channel: String,
    pub alias: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub current: Option<f64>,
    pub avg_rate_per_min: f64,
}

/// A report ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub title: String,
    /// Which data the report covers: a window, a day or a day range.
    pub label: String,
    pub generated_at: NaiveDateTime,
    pub channels: Vec<ReportChannel>,
}

impl Report {
    /// Build a report from summarized channels, aliased through `schema`.
    pub fn from_summary(
        summary: &Summary,
        schema: &ChannelSchema,
        label: impl Into<String>,
        generated_at: NaiveDateTime,
    ) -> Self {
        let channels = summary
            .iter()
            .map(|(name, stats)| ReportChannel {
                channel: name.to_string(),
                alias: schema.alias(name).to_string(),
                min: stats.min,
                max: stats.max,
                current: stats.current,
                avg_rate_per_min: stats.avg_rate_per_min,
            })
            .collect();

        Self {
            title: REPORT_TITLE.to_string(),
            label: label.into(),
            generated_at,
            channels,
        }
    }

    /// Plain-text rendering, also used as the notification fallback.
    pub fn to_text(&self) -> String {
        let mut lines = vec![
            self.title.clone(),
            format!("Data: {}", self.label),
            format!("Time: {}", self.generated_at.format(DATETIME_FORMAT)),
            String::new(),
        ];
        for ch in &self.channels {
            lines.push(format!(
                "{}: Min={}, Max={}, Current={}, Rate={:.8}/min",
                ch.alias,
                format_fixed(ch.min, 6),
                format_fixed(ch.max, 6),
                format_fixed(ch.current, 6),
                ch.avg_rate_per_min
            ));
        }
        lines.join("\n")
    }

    /// Slack Block Kit rendering.
    pub fn to_blocks(&self) -> Vec<Value> {
        let mut blocks = vec![
            json!({
                "type": "header",
                "text": {"type": "plain_text", "text": self.title, "emoji": true}
            }),
            json!({
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": format!(
                        "*Data:* `{}`\n*Report time:* {}",
                        self.label,
                        self.generated_at.format(DATETIME_FORMAT)
                    )
                }
            }),
            json!({"type": "divider"}),
        ];

        for ch in &self.channels {
            blocks.push(json!({
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": format!(
                        "*{}*\n• Min: `{}`\n• Max: `{}`\n• Current: `{}`\n• Avg rate: `{:.8}` /min",
                        ch.alias,
                        format_fixed(ch.min, 4),
                        format_fixed(ch.max, 4),
                        format_fixed(ch.current, 4),
                        ch.avg_rate_per_min
                    )
                }
            }));
        }
        blocks
    }
}

/// `"Last N hours"` for a trailing window, the date for a single day, or
/// `"<start> to <end>"`.
pub fn label_for_range(range: Option<(NaiveDate, NaiveDate)>, hours: u32) -> String {
    match range {
        None => format!("Last {hours} hours"),
        Some((start, end)) if start == end => iso_date(start),
        Some((start, end)) => format!("{} to {}", iso_date(start), iso_date(end)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::combine;
    use crate::statistics::summarize;
    use monitor_core::models::{Record, RecordRow};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn summary() -> Summary {
        let rows = ["0.0801", "0.0712346"]
            .iter()
            .map(|v| RecordRow {
                values: vec![v.to_string(), String::new()],
                time_of_day: None,
            })
            .collect();
        let record = Record::new(vec!["full range".into(), "still".into()], rows, None);
        let ds = combine(vec![(PathBuf::from("010124.txt"), Arc::new(record))]).unwrap();
        summarize(&ds, &["full range", "still"])
    }

    fn generated() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(15, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_label_for_range() {
        let d1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let d3 = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        assert_eq!(label_for_range(None, 24), "Last 24 hours");
        assert_eq!(label_for_range(Some((d1, d1)), 24), "2024-01-01");
        assert_eq!(label_for_range(Some((d1, d3)), 24), "2024-01-01 to 2024-01-03");
    }

    #[test]
    fn test_report_uses_aliases_in_summary_order() {
        let report = Report::from_summary(
            &summary(),
            &ChannelSchema::dspx(),
            "Last 24 hours",
            generated(),
        );
        let aliases: Vec<&str> = report.channels.iter().map(|c| c.alias.as_str()).collect();
        assert_eq!(aliases, vec!["MC (K)", "Still (K)"]);
        assert_eq!(report.channels[0].current, Some(0.0712346));
        assert_eq!(report.channels[1].current, None);
    }

    #[test]
    fn test_to_text() {
        let report = Report::from_summary(
            &summary(),
            &ChannelSchema::dspx(),
            "Last 24 hours",
            generated(),
        );
        let text = report.to_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], REPORT_TITLE);
        assert_eq!(lines[1], "Data: Last 24 hours");
        assert_eq!(lines[2], "Time: 2024-01-02 15:00:00");
        assert_eq!(lines[3], "");
        assert_eq!(
            lines[4],
            "MC (K): Min=0.071235, Max=0.080100, Current=0.071235, Rate=0.00000000/min"
        );
        assert_eq!(
            lines[5],
            "Still (K): Min=N/A, Max=N/A, Current=N/A, Rate=0.00000000/min"
        );
    }

    #[test]
    fn test_to_blocks() {
        let report = Report::from_summary(
            &summary(),
            &ChannelSchema::dspx(),
            "2024-01-01",
            generated(),
        );
        let blocks = report.to_blocks();
        assert_eq!(blocks.len(), 5);
        assert_eq!(blocks[0]["type"], "header");
        assert_eq!(blocks[2]["type"], "divider");
        let section = blocks[1]["text"]["text"].as_str().unwrap();
        assert!(section.contains("`2024-01-01`"));
        let mc = blocks[3]["text"]["text"].as_str().unwrap();
        assert!(mc.starts_with("*MC (K)*"));
        assert!(mc.contains("• Current: `0.0712`"));
        let still = blocks[4]["text"]["text"].as_str().unwrap();
        assert!(still.contains("• Min: `N/A`"));
        assert!(still.contains("`0.00000000` /min"));
    }
}
