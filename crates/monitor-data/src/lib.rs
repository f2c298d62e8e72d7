//! Data pipeline for Dspx-Monitor.
//!
//! Discovers the per-day log files, parses them, concatenates them into one
//! dataset, narrows it to a trailing window, summarizes channels and builds
//! the outbound report. Everything here is synchronous and free of
//! presentation concerns; the dashboard and the scheduler drive it the same
//! way.

pub mod aggregator;
pub mod catalog;
pub mod loader;
pub mod report;
pub mod statistics;
pub mod window;

pub use monitor_core as core;
