//! Period-scoped CSV export.
//!
//! One export issues three independent queries (views per destination,
//! visits per destination, and the raw interaction log) for the selected
//! period and hands each result to a [`DownloadSink`] as its own file.

pub mod csv;

pub use self::csv::{parse_csv, to_csv};

use crate::analysis;
use crate::models::{category_label, municipality_label, Period, ViewEvent, VisitEvent};
use crate::store::{fetch_or_empty, EventFilter, EventStore};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, error, info};

/// Receives exported files. Delivery is fire-and-forget.
pub trait DownloadSink: Send + Sync {
    fn deliver(&self, filename: &str, contents: &str);
}

/// Writes exported files into a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn write(&self, filename: &str, contents: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let path = self.dir.join(filename);
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&self, filename: &str, contents: &str) {
        match self.write(filename, contents) {
            Ok(path) => info!("Exported {}", path.display()),
            Err(e) => error!("Export of {} failed: {:#}", filename, e),
        }
    }
}

/// One row of the interaction log export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub kind: String,
    pub destination: String,
    pub category: String,
    pub municipality: String,
    pub visit_type: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Merge views and visits into one log, most recent first.
pub fn interaction_log(views: &[ViewEvent], visits: &[VisitEvent]) -> Vec<InteractionRecord> {
    let mut records: Vec<InteractionRecord> = views
        .iter()
        .map(|v| InteractionRecord {
            kind: "view".to_string(),
            destination: v.destination_name.clone(),
            category: category_label(v.category.as_ref()),
            municipality: municipality_label(v.municipality.as_deref()),
            visit_type: None,
            occurred_at: v.viewed_at,
        })
        .chain(visits.iter().map(|v| InteractionRecord {
            kind: "visit".to_string(),
            destination: v.destination_name.clone(),
            category: category_label(v.category.as_ref()),
            municipality: municipality_label(v.municipality.as_deref()),
            visit_type: Some(v.visit_type.to_string()),
            occurred_at: v.visited_at,
        }))
        .collect();

    records.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
    records
}

/// File name for one export, e.g. `lakbay_views_week_2026-10-16.csv`.
pub fn export_filename(kind: &str, period: Period, now: DateTime<Utc>) -> String {
    format!(
        "lakbay_{}_{}_{}.csv",
        kind,
        period.as_str(),
        now.format("%Y-%m-%d")
    )
}

/// What an export produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Files handed to the sink.
    pub delivered: Vec<String>,
    /// Exports skipped because they had no rows.
    pub skipped: Vec<String>,
}

fn period_filter(period: Period, now: DateTime<Utc>) -> EventFilter {
    match period.since(now) {
        Some(since) => EventFilter::new().since(since),
        None => EventFilter::new(),
    }
}

/// Export views, visits and the interaction log for `period`.
pub async fn export_period(
    store: &dyn EventStore,
    period: Period,
    now: DateTime<Utc>,
    sink: &dyn DownloadSink,
) -> Result<ExportSummary> {
    let filter = period_filter(period, now);
    info!("Exporting analytics for period '{}'", period);

    let views_query = async {
        let views = fetch_or_empty("export views", store.fetch_views(&filter)).await;
        analysis::most_viewed(&views, usize::MAX)
    };
    let visits_query = async {
        let visits = fetch_or_empty("export visits", store.fetch_visits(&filter)).await;
        analysis::most_visited(&visits, usize::MAX)
    };
    let log_query = async {
        let (views, visits) = futures::join!(
            fetch_or_empty("interaction views", store.fetch_views(&filter)),
            fetch_or_empty("interaction visits", store.fetch_visits(&filter)),
        );
        interaction_log(&views, &visits)
    };

    let (views, visits, log) = futures::join!(views_query, visits_query, log_query);

    let files = [
        ("views", to_csv(&views)?),
        ("visits", to_csv(&visits)?),
        ("interactions", to_csv(&log)?),
    ];

    let mut summary = ExportSummary::default();
    for (kind, csv) in files {
        let filename = export_filename(kind, period, now);
        if csv.is_empty() {
            debug!("Nothing to export for {}", filename);
            summary.skipped.push(filename);
            continue;
        }
        sink.deliver(&filename, &csv);
        summary.delivered.push(filename);
    }

    Ok(summary)
}
