//! Raw rows as stored in the remote tables.
//!
//! Category and municipality columns are free text and may be null. They
//! are normalized here, once, on the way into the engine: category codes and
//! labels both map to the same [`Category`].

use crate::models::{Category, Destination, ViewEvent, VisitEvent, VisitType, UNKNOWN};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewRow {
    #[serde(default)]
    pub destination_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub municipality: Option<String>,
    pub viewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitRow {
    #[serde(default)]
    pub destination_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub municipality: Option<String>,
    pub visited_at: DateTime<Utc>,
    #[serde(default)]
    pub visit_type: Option<String>,
}

/// Row of the `destinations` table. The municipality lives in `location`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationRow {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Contents of a JSON snapshot file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub views: Vec<ViewRow>,
    #[serde(default)]
    pub visits: Vec<VisitRow>,
    #[serde(default)]
    pub destinations: Vec<DestinationRow>,
}

fn normalize_name(name: Option<String>) -> String {
    name.filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn normalize_category(raw: Option<&str>) -> Option<Category> {
    raw.and_then(Category::parse)
}

fn normalize_text(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl From<ViewRow> for ViewEvent {
    fn from(row: ViewRow) -> Self {
        ViewEvent {
            category: normalize_category(row.category.as_deref()),
            destination_name: normalize_name(row.destination_name),
            municipality: normalize_text(row.municipality),
            viewed_at: row.viewed_at,
        }
    }
}

impl From<VisitRow> for VisitEvent {
    fn from(row: VisitRow) -> Self {
        VisitEvent {
            category: normalize_category(row.category.as_deref()),
            destination_name: normalize_name(row.destination_name),
            municipality: normalize_text(row.municipality),
            visited_at: row.visited_at,
            visit_type: row
                .visit_type
                .map(VisitType::from)
                .unwrap_or_else(|| VisitType::Other(String::new())),
        }
    }
}

impl From<DestinationRow> for Destination {
    fn from(row: DestinationRow) -> Self {
        Destination {
            category: normalize_category(row.category.as_deref()),
            name: row.name,
            municipality: normalize_text(row.location),
        }
    }
}
