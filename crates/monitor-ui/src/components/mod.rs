//! Reusable line builders shared by the dashboard view.

pub mod header;
pub mod valve_grid;
