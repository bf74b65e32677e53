//! In-memory row store.
//!
//! Applies the same filtering, ordering and row cap as the remote store.
//! Used for offline runs against a JSON snapshot and in tests.

use super::rows::Snapshot;
use super::{EventFilter, EventStore, StoreError, StoreResult, DEFAULT_ROW_CAP};
use crate::models::{Destination, EventKind, ViewEvent, VisitEvent};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct MemoryStore {
    views: Vec<ViewEvent>,
    visits: Vec<VisitEvent>,
    destinations: Vec<Destination>,
    row_cap: usize,
    latency: Option<Duration>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_ROW_CAP)
    }
}

impl MemoryStore {
    pub fn new(row_cap: usize) -> Self {
        Self {
            views: Vec::new(),
            visits: Vec::new(),
            destinations: Vec::new(),
            row_cap,
            latency: None,
        }
    }

    pub fn with_views(mut self, views: Vec<ViewEvent>) -> Self {
        self.views = views;
        self
    }

    pub fn with_visits(mut self, visits: Vec<VisitEvent>) -> Self {
        self.visits = visits;
        self
    }

    pub fn with_destinations(mut self, destinations: Vec<Destination>) -> Self {
        self.destinations = destinations;
        self
    }

    /// Simulated round-trip time applied to every query.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Build a store from parsed snapshot contents.
    pub fn from_snapshot(snapshot: Snapshot, row_cap: usize) -> Self {
        Self::new(row_cap)
            .with_views(snapshot.views.into_iter().map(ViewEvent::from).collect())
            .with_visits(snapshot.visits.into_iter().map(VisitEvent::from).collect())
            .with_destinations(
                snapshot
                    .destinations
                    .into_iter()
                    .map(Destination::from)
                    .collect(),
            )
    }

    /// Load a JSON snapshot file.
    pub fn load(path: &Path, row_cap: usize) -> StoreResult<Self> {
        let snapshot_error = |message: String| StoreError::Snapshot {
            path: path.to_path_buf(),
            message,
        };

        let content =
            std::fs::read_to_string(path).map_err(|e| snapshot_error(e.to_string()))?;
        let snapshot: Snapshot =
            serde_json::from_str(&content).map_err(|e| snapshot_error(e.to_string()))?;

        info!(
            "Loaded snapshot {}: {} views, {} visits, {} destinations",
            path.display(),
            snapshot.views.len(),
            snapshot.visits.len(),
            snapshot.destinations.len()
        );

        Ok(Self::from_snapshot(snapshot, row_cap))
    }

    async fn round_trip(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn fetch_views(&self, filter: &EventFilter) -> StoreResult<Vec<ViewEvent>> {
        self.round_trip().await;

        let mut rows: Vec<ViewEvent> = self
            .views
            .iter()
            .filter(|v| filter.matches_view(v))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.viewed_at.cmp(&a.viewed_at));
        rows.truncate(filter.effective_limit(self.row_cap));

        debug!("Memory store returned {} views", rows.len());
        Ok(rows)
    }

    async fn fetch_visits(&self, filter: &EventFilter) -> StoreResult<Vec<VisitEvent>> {
        self.round_trip().await;

        let mut rows: Vec<VisitEvent> = self
            .visits
            .iter()
            .filter(|v| filter.matches_visit(v))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.visited_at.cmp(&a.visited_at));
        rows.truncate(filter.effective_limit(self.row_cap));

        debug!("Memory store returned {} visits", rows.len());
        Ok(rows)
    }

    async fn count(&self, kind: EventKind, filter: &EventFilter) -> StoreResult<u64> {
        self.round_trip().await;

        let n = match kind {
            EventKind::View => self.views.iter().filter(|v| filter.matches_view(v)).count(),
            EventKind::Visit => self
                .visits
                .iter()
                .filter(|v| filter.matches_visit(v))
                .count(),
        };
        Ok(n as u64)
    }

    async fn fetch_destinations(&self) -> StoreResult<Vec<Destination>> {
        self.round_trip().await;
        Ok(self.destinations.iter().take(self.row_cap).cloned().collect())
    }

    async fn count_destinations(&self) -> StoreResult<u64> {
        self.round_trip().await;
        Ok(self.destinations.len() as u64)
    }
}
