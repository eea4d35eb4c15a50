pub mod api;
pub mod artifacts;
pub mod ui;
