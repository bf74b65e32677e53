//! Row store access.
//!
//! The engine reads events through the [`EventStore`] trait. Two stores are
//! provided: [`RestStore`] talks to the hosted PostgREST endpoint and
//! [`MemoryStore`] serves events from memory or a JSON snapshot.
//!
//! Retrieval errors stop at [`fetch_or_empty`] / [`count_or_zero`]: they are
//! logged and replaced with an empty result, so aggregation never sees them.

pub mod memory;
pub mod rest;
pub mod rows;

pub use memory::MemoryStore;
pub use rest::RestStore;

use crate::models::{Category, Destination, EventKind, ViewEvent, VisitEvent, VisitType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error};

/// Default maximum number of rows returned per query.
pub const DEFAULT_ROW_CAP: usize = 1000;

/// Errors raised by a row store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("row store is not configured: {0}")]
    NotConfigured(String),

    #[error("request to {table} failed: {source}")]
    Http {
        table: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{table} returned HTTP {status}: {body}")]
    Status {
        table: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode {table} response: {message}")]
    Decode { table: String, message: String },

    #[error("failed to load snapshot {}: {message}", .path.display())]
    Snapshot { path: PathBuf, message: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Filters applied by the store before rows are returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    /// Only visits whose type is in this set. Ignored for views.
    pub visit_types: Option<Vec<VisitType>>,
    /// Inclusive lower time bound.
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper time bound.
    pub until: Option<DateTime<Utc>>,
    pub category: Option<Category>,
    /// Requested row limit; the store's row cap still applies.
    pub limit: Option<usize>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visit_types(mut self, types: Vec<VisitType>) -> Self {
        self.visit_types = Some(types);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Effective row limit under `row_cap`.
    pub fn effective_limit(&self, row_cap: usize) -> usize {
        self.limit.map_or(row_cap, |l| l.min(row_cap))
    }

    fn matches(&self, ts: DateTime<Utc>, category: Option<&Category>) -> bool {
        if self.since.is_some_and(|since| ts < since) {
            return false;
        }
        if self.until.is_some_and(|until| ts >= until) {
            return false;
        }
        match &self.category {
            // Case-insensitive, like the `ilike` filter the REST store sends
            Some(wanted) => {
                category.is_some_and(|c| c.code().eq_ignore_ascii_case(wanted.code()))
            }
            None => true,
        }
    }

    pub fn matches_view(&self, view: &ViewEvent) -> bool {
        self.matches(view.viewed_at, view.category.as_ref())
    }

    pub fn matches_visit(&self, visit: &VisitEvent) -> bool {
        let type_ok = self
            .visit_types
            .as_ref()
            .map_or(true, |types| types.contains(&visit.visit_type));
        type_ok && self.matches(visit.visited_at, visit.category.as_ref())
    }
}

/// Query interface of the remote row store.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// View events, most recent first, capped at the store's row cap.
    async fn fetch_views(&self, filter: &EventFilter) -> StoreResult<Vec<ViewEvent>>;

    /// Visit events, most recent first, capped at the store's row cap.
    async fn fetch_visits(&self, filter: &EventFilter) -> StoreResult<Vec<VisitEvent>>;

    /// Count-only query. Not subject to the row cap.
    async fn count(&self, kind: EventKind, filter: &EventFilter) -> StoreResult<u64>;

    /// Destination records, capped at the store's row cap.
    async fn fetch_destinations(&self) -> StoreResult<Vec<Destination>>;

    /// Count-only query over the destinations table. Not subject to the row cap.
    async fn count_destinations(&self) -> StoreResult<u64>;
}

/// Await a row fetch, logging failures and returning no rows instead.
pub async fn fetch_or_empty<T, F>(what: &str, fetch: F) -> Vec<T>
where
    F: Future<Output = StoreResult<Vec<T>>>,
{
    match fetch.await {
        Ok(rows) => {
            debug!("Fetched {} rows for {}", rows.len(), what);
            rows
        }
        Err(e) => {
            error!("Error fetching {}: {}", what, e);
            Vec::new()
        }
    }
}

/// Await a count query, logging failures and returning zero instead.
pub async fn count_or_zero<F>(what: &str, count: F) -> u64
where
    F: Future<Output = StoreResult<u64>>,
{
    match count.await {
        Ok(n) => n,
        Err(e) => {
            error!("Error fetching {}: {}", what, e);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_effective_limit() {
        assert_eq!(EventFilter::new().effective_limit(1000), 1000);
        assert_eq!(EventFilter::new().limit(10).effective_limit(1000), 10);
        assert_eq!(EventFilter::new().limit(5000).effective_limit(1000), 1000);
    }

    #[test]
    fn test_time_bounds_are_half_open() {
        let filter = EventFilter::new().since(at(2)).until(at(4));
        let view = |h| ViewEvent::new("X", None, None, at(h));

        assert!(!filter.matches_view(&view(1)));
        assert!(filter.matches_view(&view(2)));
        assert!(filter.matches_view(&view(3)));
        assert!(!filter.matches_view(&view(4)));
    }

    #[test]
    fn test_visit_type_filter() {
        let filter = EventFilter::new().visit_types(VisitType::intents());
        let visit = |t| VisitEvent::new("X", None, None, at(1), t);

        assert!(filter.matches_visit(&visit(VisitType::Navigation)));
        assert!(filter.matches_visit(&visit(VisitType::MapsView)));
        assert!(!filter.matches_visit(&visit(VisitType::Confirmed)));
    }

    #[test]
    fn test_category_filter() {
        let filter = EventFilter::new().category(Category::Food);
        let food = ViewEvent::new("X", Some(Category::Food), None, at(1));
        let none = ViewEvent::new("Y", None, None, at(1) + Duration::minutes(1));

        assert!(filter.matches_view(&food));
        assert!(!filter.matches_view(&none));
    }

    #[test]
    fn test_category_filter_ignores_case() {
        let filter = EventFilter::new().category(Category::Other("Shopping".to_string()));
        let upper = ViewEvent::new("X", Category::parse("SHOPPING"), None, at(1));
        let lower = ViewEvent::new("Y", Category::parse("shopping"), None, at(2));
        let other = ViewEvent::new("Z", Category::parse("Nightlife"), None, at(3));

        assert!(filter.matches_view(&upper));
        assert!(filter.matches_view(&lower));
        assert!(!filter.matches_view(&other));

        let nature = EventFilter::new().category(Category::Nature);
        let shouted = ViewEvent::new("W", Category::parse("NATURE & ADVENTURE"), None, at(1));
        assert!(nature.matches_view(&shouted));
    }

    #[tokio::test]
    async fn test_fetch_or_empty_swallows_errors() {
        let rows: Vec<ViewEvent> = fetch_or_empty("views", async {
            Err(StoreError::NotConfigured("missing url".to_string()))
        })
        .await;
        assert!(rows.is_empty());

        let n = count_or_zero("views", async {
            Err(StoreError::Decode {
                table: "destination_views".to_string(),
                message: "bad".to_string(),
            })
        })
        .await;
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_fetch_or_empty_passes_rows_through() {
        let rows = fetch_or_empty("views", async {
            Ok(vec![ViewEvent::new("X", None, None, at(1))])
        })
        .await;
        assert_eq!(rows.len(), 1);
    }
}
