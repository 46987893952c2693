/// case-graph - Entity Relationship Network Engine (TUI Edition)
///
/// Core library turning investigation records (people, businesses,
/// locations, phone numbers, email addresses) and their typed connections
/// into laid-out, filterable, editable relationship graphs.

pub mod config;
pub mod core;
pub mod tui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
