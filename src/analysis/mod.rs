//! Analysis modules.
//!
//! Pure, synchronous reductions over events that have already been fetched
//! from the row store.

pub mod aggregator;
pub mod trends;

pub use aggregator::*;
pub use trends::{monthly_trends, trend_window_start, GapPolicy};
