//! Dashboard queries.
//!
//! [`Analytics`] runs each dashboard query against the row store: fetch
//! through the retrieval boundary, then aggregate. Independent fetches for
//! one view are issued concurrently and awaited together.
//!
//! [`Dashboard`] keeps the latest [`DashboardSnapshot`] and guards it with a
//! request-sequence token so a slow, superseded refresh can never overwrite
//! the result of a newer one.

use crate::analysis::{self, GapPolicy};
use crate::models::{
    Category, CategoryCount, CategoryShare, CategoryStat, ConfirmedVisits, DestinationViews,
    DestinationVisits, EventKind, MonthKey, MonthlyTrend, Totals, VisitType,
};
use crate::store::{count_or_zero, fetch_or_empty, EventFilter, EventStore};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Philippine Standard Time (UTC+8), the default display calendar.
pub fn philippine_time() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).unwrap_or_else(|| Utc.fix())
}

/// Settings that shape aggregation output.
#[derive(Debug, Clone, Copy)]
pub struct AnalyticsSettings {
    /// Offset of the display calendar used for month buckets.
    pub display_offset: FixedOffset,
    pub gap_policy: GapPolicy,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            display_offset: philippine_time(),
            gap_policy: GapPolicy::Omit,
        }
    }
}

/// Parameters for one dashboard view.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardQuery {
    pub top_n: usize,
    pub trend_months: u32,
    pub category: Option<Category>,
    /// Restrict rankings to one calendar month.
    pub month: Option<MonthKey>,
}

impl Default for DashboardQuery {
    fn default() -> Self {
        Self {
            top_n: 5,
            trend_months: 6,
            category: None,
            month: None,
        }
    }
}

/// Everything the dashboard renders, computed from one round of fetches.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub generated_at: DateTime<Utc>,
    pub totals: Totals,
    pub most_viewed: Vec<DestinationViews>,
    pub most_visited: Vec<DestinationVisits>,
    pub most_confirmed: Vec<ConfirmedVisits>,
    pub category_views: Vec<CategoryShare>,
    pub category_visits: Vec<CategoryCount>,
    pub categories: Vec<CategoryStat>,
    pub monthly_trends: Vec<MonthlyTrend>,
}

/// Query runner over a row store.
#[derive(Clone)]
pub struct Analytics {
    store: Arc<dyn EventStore>,
    settings: AnalyticsSettings,
}

impl Analytics {
    pub fn new(store: Arc<dyn EventStore>, settings: AnalyticsSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &AnalyticsSettings {
        &self.settings
    }

    /// Base filter for ranking queries, from the category/month selectors.
    pub fn ranking_filter(
        &self,
        category: Option<&Category>,
        month: Option<MonthKey>,
    ) -> EventFilter {
        let mut filter = EventFilter::new();
        if let Some(category) = category {
            filter = filter.category(category.clone());
        }
        let range = month.and_then(|m| m.utc_range(self.settings.display_offset));
        if let Some((start, end)) = range {
            filter = filter.since(start).until(end);
        }
        filter
    }

    /// Headline counters, using count-only queries.
    pub async fn totals(&self) -> Totals {
        let all = EventFilter::new();
        let confirmed = EventFilter::new().visit_types(vec![VisitType::Confirmed]);
        let intents = EventFilter::new().visit_types(VisitType::intents());

        let (views, visits, confirmed, intents, destination_count, destinations) = futures::join!(
            count_or_zero("total views", self.store.count(EventKind::View, &all)),
            count_or_zero("total visits", self.store.count(EventKind::Visit, &all)),
            count_or_zero(
                "confirmed visits",
                self.store.count(EventKind::Visit, &confirmed)
            ),
            count_or_zero("visit intents", self.store.count(EventKind::Visit, &intents)),
            count_or_zero("total destinations", self.store.count_destinations()),
            fetch_or_empty("destinations", self.store.fetch_destinations()),
        );

        Totals {
            views,
            visits,
            confirmed,
            intents,
            destinations: destination_count,
            categories: analysis::distinct_categories(&destinations) as u64,
        }
    }

    pub async fn most_viewed(&self, limit: usize, filter: &EventFilter) -> Vec<DestinationViews> {
        let views = fetch_or_empty("most viewed", self.store.fetch_views(filter)).await;
        analysis::most_viewed(&views, limit)
    }

    pub async fn most_visited(
        &self,
        limit: usize,
        filter: &EventFilter,
    ) -> Vec<DestinationVisits> {
        let visits = fetch_or_empty("most visited", self.store.fetch_visits(filter)).await;
        analysis::most_visited(&visits, limit)
    }

    pub async fn most_confirmed(
        &self,
        limit: usize,
        filter: &EventFilter,
    ) -> Vec<ConfirmedVisits> {
        let filter = filter.clone().visit_types(vec![VisitType::Confirmed]);
        let visits = fetch_or_empty("confirmed visits", self.store.fetch_visits(&filter)).await;
        analysis::most_confirmed(&visits, limit)
    }

    pub async fn category_views(&self) -> Vec<CategoryShare> {
        let all = EventFilter::new();
        let views = fetch_or_empty("views by category", self.store.fetch_views(&all)).await;
        analysis::category_shares(&views)
    }

    pub async fn category_visits(&self) -> Vec<CategoryCount> {
        let all = EventFilter::new();
        let visits = fetch_or_empty("visits by category", self.store.fetch_visits(&all)).await;
        analysis::visits_by_category(&visits)
    }

    pub async fn category_rollup(&self) -> Vec<CategoryStat> {
        let all = EventFilter::new();
        let (destinations, views, visits) = futures::join!(
            fetch_or_empty("destinations", self.store.fetch_destinations()),
            fetch_or_empty("category views", self.store.fetch_views(&all)),
            fetch_or_empty("category visits", self.store.fetch_visits(&all)),
        );
        analysis::category_rollup(&destinations, &views, &visits)
    }

    /// Monthly views/visits over the trailing `months` ending at `now`.
    pub async fn monthly_trends(&self, months: u32, now: DateTime<Utc>) -> Vec<MonthlyTrend> {
        let filter = EventFilter::new().since(analysis::trend_window_start(now, months));
        let (views, visits) = futures::join!(
            fetch_or_empty("trend views", self.store.fetch_views(&filter)),
            fetch_or_empty("trend visits", self.store.fetch_visits(&filter)),
        );
        analysis::monthly_trends(
            &views,
            &visits,
            self.settings.display_offset,
            self.settings.gap_policy,
        )
    }

    /// Run every dashboard query concurrently.
    pub async fn snapshot(
        &self,
        query: &DashboardQuery,
        now: DateTime<Utc>,
    ) -> DashboardSnapshot {
        let filter = self.ranking_filter(query.category.as_ref(), query.month);

        let (
            totals,
            most_viewed,
            most_visited,
            most_confirmed,
            category_views,
            category_visits,
            categories,
            monthly_trends,
        ) = futures::join!(
            self.totals(),
            self.most_viewed(query.top_n, &filter),
            self.most_visited(query.top_n, &filter),
            self.most_confirmed(query.top_n, &filter),
            self.category_views(),
            self.category_visits(),
            self.category_rollup(),
            self.monthly_trends(query.trend_months, now),
        );

        debug!(
            "Snapshot: {} viewed, {} visited, {} trend buckets",
            most_viewed.len(),
            most_visited.len(),
            monthly_trends.len()
        );

        DashboardSnapshot {
            generated_at: now,
            totals,
            most_viewed,
            most_visited,
            most_confirmed,
            category_views,
            category_visits,
            categories,
            monthly_trends,
        }
    }
}

/// Token identifying one issued refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(u64);

/// Hands out monotonically increasing request tokens.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: AtomicU64,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token newer than every token issued before it.
    pub fn issue(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether `token` is still the most recently issued one.
    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }
}

/// Result of a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// A newer refresh was issued while this one was in flight.
    Discarded,
}

/// Holds the latest applied snapshot.
pub struct Dashboard {
    analytics: Analytics,
    sequencer: RequestSequencer,
    state: RwLock<Option<(DashboardQuery, DashboardSnapshot)>>,
}

impl Dashboard {
    pub fn new(analytics: Analytics) -> Self {
        Self {
            analytics,
            sequencer: RequestSequencer::new(),
            state: RwLock::new(None),
        }
    }

    /// Recompute the dashboard for `query`.
    ///
    /// The result is stored only if no newer refresh has been issued since
    /// this one started.
    pub async fn refresh(&self, query: DashboardQuery, now: DateTime<Utc>) -> RefreshOutcome {
        let token = self.sequencer.issue();
        let snapshot = self.analytics.snapshot(&query, now).await;

        let mut state = self.state.write().await;
        if !self.sequencer.is_current(token) {
            info!("Discarding stale dashboard refresh {:?}", token);
            return RefreshOutcome::Discarded;
        }

        *state = Some((query, snapshot));
        RefreshOutcome::Applied
    }

    /// The query and snapshot of the latest applied refresh.
    pub async fn current(&self) -> Option<(DashboardQuery, DashboardSnapshot)> {
        self.state.read().await.clone()
    }
}
