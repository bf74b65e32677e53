//! Data models for the analytics engine.
//!
//! This module contains the raw event types read from the row store and the
//! derived aggregate rows handed to the presentation layer. Aggregates are
//! never persisted; they are recomputed from fetched events on every query.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Label substituted for missing category or municipality metadata.
pub const UNKNOWN: &str = "Unknown";

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Canonical destination category.
///
/// The row store holds a mix of internal codes (`nature`) and display labels
/// (`Nature & Adventure`). Both spellings parse to the same variant so that a
/// single logical category never splits into two aggregate rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Nature,
    Food,
    Heritage,
    Resorts,
    Other(String),
}

impl Category {
    /// The known categories, in display order.
    pub const KNOWN: [Category; 4] = [
        Category::Nature,
        Category::Food,
        Category::Heritage,
        Category::Resorts,
    ];

    /// Parse a raw category value (code or label, any case).
    ///
    /// Returns `None` for blank input so callers can substitute [`UNKNOWN`].
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let lowered = trimmed.to_lowercase();
        let category = Self::KNOWN
            .into_iter()
            .find(|c| c.code() == lowered || c.label().to_lowercase() == lowered)
            .unwrap_or_else(|| Category::Other(trimmed.to_string()));

        Some(category)
    }

    /// Internal code stored by the mobile app.
    pub fn code(&self) -> &str {
        match self {
            Category::Nature => "nature",
            Category::Food => "food",
            Category::Heritage => "heritage",
            Category::Resorts => "resorts",
            Category::Other(s) => s,
        }
    }

    /// Human-readable label shown on the dashboard.
    pub fn label(&self) -> &str {
        match self {
            Category::Nature => "Nature & Adventure",
            Category::Food => "Food & Dining",
            Category::Heritage => "Heritage & Culture",
            Category::Resorts => "Resort & Recreation",
            Category::Other(s) => s,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::parse(s).ok_or_else(|| "Category must not be empty".to_string())
    }
}

/// Display label for an optional category.
pub fn category_label(category: Option<&Category>) -> String {
    category.map(Category::label).unwrap_or(UNKNOWN).to_string()
}

/// Display label for an optional municipality.
pub fn municipality_label(municipality: Option<&str>) -> String {
    match municipality.map(str::trim) {
        Some(m) if !m.is_empty() => m.to_string(),
        _ => UNKNOWN.to_string(),
    }
}

/// Subtype of a visit event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VisitType {
    /// Verified on-site presence (geofence trigger).
    Confirmed,
    /// User tapped "navigate".
    Navigation,
    /// User opened the destination in a maps app.
    MapsView,
    Other(String),
}

impl VisitType {
    /// Visit types that signal intent without confirmed arrival.
    pub fn intents() -> Vec<VisitType> {
        vec![VisitType::Navigation, VisitType::MapsView]
    }

    pub fn as_str(&self) -> &str {
        match self {
            VisitType::Confirmed => "confirmed",
            VisitType::Navigation => "navigation",
            VisitType::MapsView => "maps_view",
            VisitType::Other(s) => s,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, VisitType::Confirmed)
    }

    pub fn is_intent(&self) -> bool {
        matches!(self, VisitType::Navigation | VisitType::MapsView)
    }
}

impl fmt::Display for VisitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for VisitType {
    fn from(s: String) -> Self {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "confirmed" => VisitType::Confirmed,
            "navigation" => VisitType::Navigation,
            "maps_view" => VisitType::MapsView,
            _ => VisitType::Other(s),
        }
    }
}

impl From<VisitType> for String {
    fn from(v: VisitType) -> Self {
        v.as_str().to_string()
    }
}

/// Event class stored in the row store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    View,
    Visit,
}

impl EventKind {
    /// Remote table holding this event class.
    pub fn table(&self) -> &'static str {
        match self {
            EventKind::View => "destination_views",
            EventKind::Visit => "destination_visits",
        }
    }

    /// Timestamp column used for ordering and time filters.
    pub fn timestamp_column(&self) -> &'static str {
        match self {
            EventKind::View => "viewed_at",
            EventKind::Visit => "visited_at",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::View => "view",
            EventKind::Visit => "visit",
        }
    }
}

/// A user viewed a destination's detail page.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewEvent {
    pub destination_name: String,
    pub category: Option<Category>,
    pub municipality: Option<String>,
    pub viewed_at: DateTime<Utc>,
}

impl ViewEvent {
    pub fn new(
        destination_name: impl Into<String>,
        category: Option<Category>,
        municipality: Option<&str>,
        viewed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            destination_name: destination_name.into(),
            category,
            municipality: municipality.map(String::from),
            viewed_at,
        }
    }
}

/// A confirmed visit or a visit intent.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitEvent {
    pub destination_name: String,
    pub category: Option<Category>,
    pub municipality: Option<String>,
    pub visited_at: DateTime<Utc>,
    pub visit_type: VisitType,
}

impl VisitEvent {
    pub fn new(
        destination_name: impl Into<String>,
        category: Option<Category>,
        municipality: Option<&str>,
        visited_at: DateTime<Utc>,
        visit_type: VisitType,
    ) -> Self {
        Self {
            destination_name: destination_name.into(),
            category,
            municipality: municipality.map(String::from),
            visited_at,
            visit_type,
        }
    }
}

/// A destination record, used for per-category destination counts.
#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    pub name: String,
    pub category: Option<Category>,
    pub municipality: Option<String>,
}

/// Per-destination view ranking row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationViews {
    pub name: String,
    pub category: String,
    pub municipality: String,
    pub views: usize,
}

/// Per-destination visit ranking row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationVisits {
    pub name: String,
    pub category: String,
    pub municipality: String,
    pub visits: usize,
    pub confirmed: usize,
    /// Visits that were not confirmed (`visits - confirmed`).
    pub intents: usize,
}

/// Per-destination confirmed-visit ranking row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedVisits {
    pub name: String,
    pub category: String,
    pub municipality: String,
    pub visits: usize,
}

/// Event count for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub name: String,
    pub count: usize,
}

/// Share of total views for one category, as a percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub name: String,
    pub views: usize,
    pub share: f64,
}

/// Category rollup row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStat {
    pub name: String,
    pub destination_count: usize,
    pub total_views: usize,
    pub total_visits: usize,
    pub confirmed: usize,
    pub intents: usize,
}

/// One monthly bucket of the trend chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTrend {
    /// Display label, e.g. `"Mar 2026"`.
    pub month: String,
    pub year: i32,
    pub month_number: u32,
    pub views: usize,
    pub visits: usize,
}

/// Headline counters for the overview cards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub views: u64,
    pub visits: u64,
    pub confirmed: u64,
    pub intents: u64,
    pub destinations: u64,
    pub categories: u64,
}

/// Calendar month in the display time zone.
///
/// Ordering compares `(year, month)` integers, so sorting is chronological
/// regardless of how the label reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// Bucket a UTC timestamp by its month in `offset`.
    pub fn from_timestamp(ts: DateTime<Utc>, offset: FixedOffset) -> Self {
        let local = ts.with_timezone(&offset);
        Self {
            year: local.year(),
            month: local.month(),
        }
    }

    /// The following calendar month.
    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// `"Mon YYYY"` label.
    pub fn label(&self) -> String {
        let name = MONTH_NAMES[(self.month as usize).saturating_sub(1) % 12];
        format!("{} {}", name, self.year)
    }

    /// Half-open UTC range `[start, end)` covering this month in `offset`.
    pub fn utc_range(&self, offset: FixedOffset) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = month_start(*self, offset)?;
        let end = month_start(self.next(), offset)?;
        Some((start, end))
    }
}

fn month_start(key: MonthKey, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let date = NaiveDate::from_ymd_opt(key.year, key.month, 1)?;
    let local = offset
        .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
        .single()?;
    Some(local.with_timezone(&Utc))
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = String;

    /// Parses `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("Invalid month '{}', expected YYYY-MM", s))?;

        let year: i32 = year
            .parse()
            .map_err(|_| format!("Invalid year in '{}'", s))?;
        let month: u32 = month
            .parse()
            .map_err(|_| format!("Invalid month in '{}'", s))?;

        MonthKey::new(year, month).ok_or_else(|| format!("Month out of range in '{}'", s))
    }
}

/// Export period selected by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    /// Last 24 hours
    Day,
    /// Last 7 days
    Week,
    /// Last 30 days (default)
    #[default]
    Month,
    /// No time bound
    All,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
            Period::All => "all",
        }
    }

    /// Lower time bound of the rolling window ending at `now`.
    pub fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Period::Day => Some(now - Duration::days(1)),
            Period::Week => Some(now - Duration::days(7)),
            Period::Month => Some(now - Duration::days(30)),
            Period::All => None,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
