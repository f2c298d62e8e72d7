//! Terminal dashboard for Dspx-Monitor.
//!
//! Provides themes, the header and valve-grid components, the dashboard view
//! and the application event loop, built on [`ratatui`].

pub mod app;
pub mod components;
pub mod dashboard_view;
pub mod themes;

pub use monitor_core as core;
