//! Lakbay Analytics - aggregation engine for the Lakbay CamSur admin dashboard.
//!
//! Destination view and visit events are read from a row store, aggregated
//! into rankings, category breakdowns and monthly trends, and handed to a
//! dashboard, a report writer, or CSV export.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod export;
pub mod models;
pub mod report;
pub mod store;
