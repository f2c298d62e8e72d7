//! Runtime layer for Dspx-Monitor.
//!
//! Owns the record cache, report delivery and the background scheduler, and
//! hands ready-made datasets and reports to the presentation layer.

pub mod data_manager;
pub mod messaging;
pub mod scheduler;

pub use monitor_core as core;
pub use monitor_data as data;
