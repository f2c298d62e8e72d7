use crate::schema::ChannelKind;

/// Placeholder for a channel with no value.
pub const MISSING: &str = "N/A";

/// Format an optional value with a fixed number of decimals, or `"N/A"`.
///
/// # Examples
///
/// ```
/// use monitor_core::formatting::format_fixed;
///
/// assert_eq!(format_fixed(Some(0.0123456), 4), "0.0123");
/// assert_eq!(format_fixed(Some(-2.5), 1), "-2.5");
/// assert_eq!(format_fixed(None, 4), "N/A");
/// ```
pub fn format_fixed(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => MISSING.to_string(),
    }
}

/// Scientific notation with a signed, at-least-two-digit exponent.
///
/// # Examples
///
/// ```
/// use monitor_core::formatting::format_scientific;
///
/// assert_eq!(format_scientific(0.00123456, 6), "1.234560e-03");
/// assert_eq!(format_scientific(1013.25, 2), "1.01e+03");
/// assert_eq!(format_scientific(0.0, 1), "0.0e+00");
/// ```
pub fn format_scientific(value: f64, decimals: usize) -> String {
    let raw = format!("{:.*e}", decimals, value);
    match raw.split_once('e') {
        Some((mantissa, exponent)) => {
            let exp: i32 = exponent.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => raw,
    }
}

/// `"ON"` when the flag reads exactly 1, otherwise `"OFF"`.
pub fn format_status(value: Option<f64>) -> &'static str {
    if value == Some(1.0) {
        "ON"
    } else {
        "OFF"
    }
}

/// Display a reading the way the dashboard shows each kind of channel.
///
/// # Examples
///
/// ```
/// use monitor_core::formatting::format_reading;
/// use monitor_core::schema::ChannelKind;
///
/// assert_eq!(format_reading(ChannelKind::Temperature, Some(0.0123)), "0.012300");
/// assert_eq!(format_reading(ChannelKind::Pressure, Some(2.5e-4)), "2.500000e-04");
/// assert_eq!(format_reading(ChannelKind::TurboSpeed, Some(99.5)), "99.50");
/// assert_eq!(format_reading(ChannelKind::Resistance, Some(1234.56789)), "1234.568");
/// assert_eq!(format_reading(ChannelKind::Status, Some(1.0)), "[ON] ON");
/// assert_eq!(format_reading(ChannelKind::Temperature, None), "N/A");
/// ```
pub fn format_reading(kind: ChannelKind, value: Option<f64>) -> String {
    if kind == ChannelKind::Status {
        let status = format_status(value);
        return format!("[{status}] {status}");
    }
    let Some(v) = value else {
        return MISSING.to_string();
    };
    match kind {
        ChannelKind::Pressure => format_scientific(v, 6),
        ChannelKind::PressureSensor | ChannelKind::TurboSpeed => format!("{v:.2}"),
        ChannelKind::Resistance | ChannelKind::Mixture => format!("{v:.3}"),
        ChannelKind::Temperature | ChannelKind::Status => format!("{v:.6}"),
    }
}

/// Format an integer count with thousands separators.
///
/// # Examples
///
/// ```
/// use monitor_core::formatting::format_count;
///
/// assert_eq!(format_count(0), "0");
/// assert_eq!(format_count(999), "999");
/// assert_eq!(format_count(2880), "2,880");
/// assert_eq!(format_count(1234567), "1,234,567");
/// ```
pub fn format_count(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
