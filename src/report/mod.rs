//! Report rendering.
//!
//! Markdown and JSON reports, chart-ready CSV tables and the console
//! summary table.

pub mod export;
pub mod generator;

pub use export::{export_tables, summary_table};
pub use generator::{generate_json_report, generate_markdown_report};
