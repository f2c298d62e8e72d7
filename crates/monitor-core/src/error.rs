use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by Dspx-Monitor.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A tab-separated data file could not be parsed.
    #[error("Failed to parse data file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A data file has no header row.
    #[error("Data file is empty: {0}")]
    EmptyFile(PathBuf),

    /// A date or time string did not match the expected format.
    #[error("Invalid date/time: {0}")]
    DateTimeParse(String),

    /// No data files exist for the requested window.
    #[error("No data files found in {0}")]
    NoDataFiles(PathBuf),

    /// Every candidate data file failed to load.
    #[error("No data could be loaded: {0}")]
    NoData(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A report could not be handed to the messaging endpoint.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the monitor crates.
pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = MonitorError::FileRead {
            path: PathBuf::from("/data/010124.txt"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/data/010124.txt"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_empty_file() {
        let err = MonitorError::EmptyFile(PathBuf::from("/data/010124.txt"));
        assert_eq!(err.to_string(), "Data file is empty: /data/010124.txt");
    }

    #[test]
    fn test_error_display_datetime_parse() {
        let err = MonitorError::DateTimeParse("25:99".to_string());
        assert_eq!(err.to_string(), "Invalid date/time: 25:99");
    }

    #[test]
    fn test_error_display_no_data_files() {
        let err = MonitorError::NoDataFiles(PathBuf::from("/empty/dir"));
        assert_eq!(err.to_string(), "No data files found in /empty/dir");
    }

    #[test]
    fn test_error_display_config() {
        let err = MonitorError::Config("missing bot token".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing bot token");
    }

    #[test]
    fn test_error_display_delivery() {
        let err = MonitorError::Delivery("Slack API error: channel_not_found".to_string());
        assert_eq!(
            err.to_string(),
            "Delivery failed: Slack API error: channel_not_found"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: MonitorError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: MonitorError = json_err.into();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }
}
