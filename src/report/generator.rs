//! Markdown report generation.
//!
//! This module generates Markdown and JSON analytics reports from a
//! dashboard snapshot. Empty sections render an empty-state line rather
//! than being treated as errors.

use crate::dashboard::DashboardSnapshot;
use crate::models::{
    CategoryShare, CategoryStat, ConfirmedVisits, DestinationViews, DestinationVisits,
    MonthlyTrend, Totals,
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const EMPTY_STATE: &str = "_No data yet._\n\n";

/// Metadata about the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Where events were read from (store URL or snapshot path).
    pub source: String,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Maximum rows read per query.
    pub row_cap: usize,
    /// Number of entries in each ranking.
    pub top_n: usize,
    /// Trailing months covered by the trend section.
    pub trend_months: u32,
}

/// A complete analytics report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub snapshot: DashboardSnapshot,
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let snapshot = &report.snapshot;
    let mut output = String::new();

    output.push_str("# Lakbay CamSur Analytics Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_totals_section(&snapshot.totals));
    output.push_str(&generate_most_viewed_section(&snapshot.most_viewed));
    output.push_str(&generate_most_visited_section(&snapshot.most_visited));
    output.push_str(&generate_confirmed_section(&snapshot.most_confirmed));
    output.push_str(&generate_category_views_section(&snapshot.category_views));
    output.push_str(&generate_category_section(&snapshot.categories));
    output.push_str(&generate_trends_section(&snapshot.monthly_trends));
    output.push_str(&generate_footer(report.metadata.row_cap));

    output
}

fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Top N:** {}\n", metadata.top_n));
    section.push_str(&format!(
        "- **Trend Window:** {} months\n",
        metadata.trend_months
    ));
    section.push('\n');

    section
}

fn generate_totals_section(totals: &Totals) -> String {
    let mut section = String::new();

    section.push_str("## Overview\n\n");
    section.push_str("| Destinations | Categories | Views | Visits | Confirmed | Intents |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | {} | {} |\n\n",
        totals.destinations,
        totals.categories,
        totals.views,
        totals.visits,
        totals.confirmed,
        totals.intents
    ));

    section
}

fn generate_most_viewed_section(rows: &[DestinationViews]) -> String {
    let mut section = String::from("## Most Viewed Destinations\n\n");

    if rows.is_empty() {
        section.push_str(EMPTY_STATE);
        return section;
    }

    section.push_str("| # | Destination | Category | Municipality | Views |\n");
    section.push_str("|:---:|:---|:---|:---|:---:|\n");
    for (i, row) in rows.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            i + 1,
            row.name,
            row.category,
            row.municipality,
            row.views
        ));
    }
    section.push('\n');

    section
}

fn generate_most_visited_section(rows: &[DestinationVisits]) -> String {
    let mut section = String::from("## Most Visited Destinations\n\n");

    if rows.is_empty() {
        section.push_str(EMPTY_STATE);
        return section;
    }

    section.push_str("| # | Destination | Category | Visits | Confirmed | Intents |\n");
    section.push_str("|:---:|:---|:---|:---:|:---:|:---:|\n");
    for (i, row) in rows.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            i + 1,
            row.name,
            row.category,
            row.visits,
            row.confirmed,
            row.intents
        ));
    }
    section.push('\n');

    section
}

fn generate_confirmed_section(rows: &[ConfirmedVisits]) -> String {
    let mut section = String::from("## Confirmed Visits\n\n");

    if rows.is_empty() {
        section.push_str(EMPTY_STATE);
        return section;
    }

    section.push_str("| # | Destination | Municipality | Visits |\n");
    section.push_str("|:---:|:---|:---|:---:|\n");
    for (i, row) in rows.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            i + 1,
            row.name,
            row.municipality,
            row.visits
        ));
    }
    section.push('\n');

    section
}

fn generate_category_views_section(rows: &[CategoryShare]) -> String {
    let mut section = String::from("## Views by Category\n\n");

    if rows.is_empty() {
        section.push_str(EMPTY_STATE);
        return section;
    }

    section.push_str("| Category | Views | Share |\n");
    section.push_str("|:---|:---:|:---:|\n");
    for row in rows {
        section.push_str(&format!(
            "| {} | {} | {:.1}% |\n",
            row.name, row.views, row.share
        ));
    }
    section.push('\n');

    section
}

fn generate_category_section(rows: &[CategoryStat]) -> String {
    let mut section = String::from("## Category Performance\n\n");

    if rows.is_empty() {
        section.push_str(EMPTY_STATE);
        return section;
    }

    section.push_str("| Category | Destinations | Views | Visits | Confirmed | Intents |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---:|:---:|\n");
    for row in rows {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            row.name,
            row.destination_count,
            row.total_views,
            row.total_visits,
            row.confirmed,
            row.intents
        ));
    }
    section.push('\n');

    section
}

fn generate_trends_section(rows: &[MonthlyTrend]) -> String {
    let mut section = String::from("## Monthly Trends\n\n");

    if rows.is_empty() {
        section.push_str(EMPTY_STATE);
        return section;
    }

    section.push_str("| Month | Views | Visits |\n");
    section.push_str("|:---|:---:|:---:|\n");
    for row in rows {
        section.push_str(&format!("| {} | {} | {} |\n", row.month, row.views, row.visits));
    }
    section.push('\n');

    section
}

fn generate_footer(row_cap: usize) -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Rankings and category figures are computed from at most the {} most recent events per query.*\n",
        row_cap
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn create_test_report() -> Report {
        let generated_at = Utc.with_ymd_and_hms(2026, 10, 16, 8, 30, 0).unwrap();

        Report {
            metadata: ReportMetadata {
                source: "snapshot.json".to_string(),
                generated_at,
                row_cap: 1000,
                top_n: 5,
                trend_months: 6,
            },
            snapshot: DashboardSnapshot {
                generated_at,
                totals: Totals {
                    views: 5,
                    visits: 5,
                    confirmed: 2,
                    intents: 3,
                    destinations: 3,
                    categories: 2,
                },
                most_viewed: vec![DestinationViews {
                    name: "Caramoan Islands".to_string(),
                    category: "Nature & Adventure".to_string(),
                    municipality: "Caramoan".to_string(),
                    views: 3,
                }],
                most_visited: vec![DestinationVisits {
                    name: "Mt. Isarog".to_string(),
                    category: "Nature & Adventure".to_string(),
                    municipality: "Pili".to_string(),
                    visits: 5,
                    confirmed: 2,
                    intents: 3,
                }],
                most_confirmed: Vec::new(),
                category_views: vec![CategoryShare {
                    name: "Nature & Adventure".to_string(),
                    views: 3,
                    share: 60.0,
                }],
                category_visits: Vec::new(),
                categories: Vec::new(),
                monthly_trends: vec![MonthlyTrend {
                    month: "Oct 2026".to_string(),
                    year: 2026,
                    month_number: 10,
                    views: 5,
                    visits: 5,
                }],
            },
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let markdown = generate_markdown_report(&create_test_report());

        assert!(markdown.contains("# Lakbay CamSur Analytics Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("| 1 | Caramoan Islands | Nature & Adventure | Caramoan | 3 |"));
        assert!(markdown.contains("| 1 | Mt. Isarog | Nature & Adventure | 5 | 2 | 3 |"));
        assert!(markdown.contains("| Nature & Adventure | 3 | 60.0% |"));
        assert!(markdown.contains("| Oct 2026 | 5 | 5 |"));
        assert!(markdown.contains("1000 most recent events"));
    }

    #[test]
    fn test_empty_sections_render_empty_state() {
        let markdown = generate_markdown_report(&create_test_report());
        let confirmed = markdown
            .split("## Confirmed Visits")
            .nth(1)
            .unwrap_or_default();

        assert!(confirmed.trim_start().starts_with("_No data yet._"));
    }

    #[test]
    fn test_generate_metadata_section() {
        let section = generate_metadata_section(&create_test_report().metadata);

        assert!(section.contains("snapshot.json"));
        assert!(section.contains("2026-10-16 08:30:00 UTC"));
        assert!(section.contains("6 months"));
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&create_test_report()).unwrap();

        assert!(json.contains("\"metadata\""));
        assert!(json.contains("\"most_viewed\""));
        assert!(json.contains("\"monthly_trends\""));
    }
}
