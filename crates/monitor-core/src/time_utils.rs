//! Date and time conventions shared by every stage of the pipeline.
//!
//! The refrigerator writes one file per local calendar day named `MMDDYY.txt`
//! and stamps each row with a local `HH:MM:SS` clock time. All times here are
//! naive local times; the device has no notion of a timezone.

use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use crate::error::{MonitorError, Result};

/// Extension carried by every data file.
pub const DATA_FILE_EXTENSION: &str = "txt";

/// `strftime` layout of a data file stem.
pub const FILE_DATE_FORMAT: &str = "%m%d%y";

/// Layout of the per-row clock time column.
pub const TIME_OF_DAY_FORMAT: &str = "%H:%M:%S";

/// Layout of the composite `datetime` key built during aggregation.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Layout of an ISO calendar date.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

fn file_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{6})\.txt$").expect("static regex"))
}

fn stem_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{6}$").expect("static regex"))
}

// ── File dates ────────────────────────────────────────────────────────────────

/// Decode the calendar date of a data file from its name (`"010124.txt"`).
///
/// Returns `None` for anything that is not exactly six digits followed by
/// `.txt`, and for digit strings that do not form a real date.
pub fn parse_file_date(file_name: &str) -> Option<NaiveDate> {
    let caps = file_name_regex().captures(file_name)?;
    parse_date_stem(caps.get(1)?.as_str())
}

/// Decode a six-digit `MMDDYY` stem.
///
/// Two-digit years follow the POSIX pivot: `00`–`68` are 2000–2068 and
/// `69`–`99` are 1969–1999.
pub fn parse_date_stem(stem: &str) -> Option<NaiveDate> {
    if !stem_regex().is_match(stem) {
        return None;
    }
    let month: u32 = stem[0..2].parse().ok()?;
    let day: u32 = stem[2..4].parse().ok()?;
    let yy: i32 = stem[4..6].parse().ok()?;
    let year = if yy < 69 { 2000 + yy } else { 1900 + yy };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Name of the data file holding `date` (`2024-01-01` → `"010124.txt"`).
pub fn file_name_for(date: NaiveDate) -> String {
    format!("{}.{}", date.format(FILE_DATE_FORMAT), DATA_FILE_EXTENSION)
}

/// Format a date as `YYYY-MM-DD`.
pub fn iso_date(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}

// ── Row times ─────────────────────────────────────────────────────────────────

/// Parse a row's `HH:MM:SS` clock time.
pub fn parse_time_of_day(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text, TIME_OF_DAY_FORMAT).ok()
}

/// Parse a composite `YYYY-MM-DD HH:MM:SS` key.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, DATETIME_FORMAT).ok()
}

// ── CLI values ────────────────────────────────────────────────────────────────

/// Parse a `YYYY-MM-DD` date given on the command line.
pub fn parse_iso_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), ISO_DATE_FORMAT)
        .map_err(|_| MonitorError::DateTimeParse(text.to_string()))
}

/// Parse a wall-clock time given as `HH:MM` or `HH:MM:SS`.
pub fn parse_clock_time(text: &str) -> Result<NaiveTime> {
    let trimmed = text.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, TIME_OF_DAY_FORMAT))
        .map_err(|_| MonitorError::DateTimeParse(text.to_string()))
}

// ── Scheduling and timestamps ─────────────────────────────────────────────────

/// The next moment strictly after `now` whose clock time is `at`.
pub fn next_daily_occurrence(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Seconds since the UNIX epoch as a float, `0.0` for pre-epoch times.
pub fn system_time_to_unix(time: SystemTime) -> f64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Current UNIX time in fractional seconds.
pub fn unix_now() -> f64 {
    system_time_to_unix(SystemTime::now())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
