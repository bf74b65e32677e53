//! Report generation.
//!
//! Renders a dashboard snapshot as a Markdown or JSON report.

pub mod generator;

pub use generator::{generate_json_report, generate_markdown_report, Report, ReportMetadata};
