//! Shared building blocks for Dspx-Monitor.
//!
//! Holds the error type, the data model for files, records and datasets,
//! the explicit channel schema of the refrigerator, date/time conventions,
//! value formatting, runtime settings and the cross-process refresh signal.

pub mod error;
pub mod formatting;
pub mod models;
pub mod schema;
pub mod settings;
pub mod signal;
pub mod time_utils;
