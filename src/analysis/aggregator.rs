//! Event aggregation and ranking.
//!
//! This module turns flat lists of view and visit events into ranked
//! per-destination rows and per-category rollups. Every function is a pure
//! reduction over the events it is given: grouping preserves first-seen
//! order, and ranking uses a stable sort so ties keep that order.

use crate::models::{
    category_label, municipality_label, Category, CategoryCount, CategoryShare, CategoryStat,
    ConfirmedVisits, Destination, DestinationViews, DestinationVisits, ViewEvent, VisitEvent,
    UNKNOWN,
};
use indexmap::IndexMap;
use std::cmp::Reverse;

/// Sort rows descending by `key` and keep the first `limit`.
///
/// `sort_by_key` is stable, so rows with equal counts stay in the order
/// they were first seen.
fn rank<T>(mut rows: Vec<T>, key: impl Fn(&T) -> usize, limit: usize) -> Vec<T> {
    rows.sort_by_key(|row| Reverse(key(row)));
    rows.truncate(limit);
    rows
}

/// Percentage of `part` in `total`. Zero when `total` is zero.
pub fn share_of(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

fn destination_key(name: &str) -> &str {
    if name.trim().is_empty() {
        UNKNOWN
    } else {
        name
    }
}

/// Rank destinations by number of views.
pub fn most_viewed(views: &[ViewEvent], limit: usize) -> Vec<DestinationViews> {
    let mut grouped: IndexMap<&str, DestinationViews> = IndexMap::new();

    for view in views {
        let key = destination_key(&view.destination_name);
        grouped
            .entry(key)
            .or_insert_with(|| DestinationViews {
                name: key.to_string(),
                category: category_label(view.category.as_ref()),
                municipality: municipality_label(view.municipality.as_deref()),
                views: 0,
            })
            .views += 1;
    }

    rank(grouped.into_values().collect(), |d| d.views, limit)
}

/// Rank destinations by number of visits of any type.
pub fn most_visited(visits: &[VisitEvent], limit: usize) -> Vec<DestinationVisits> {
    let mut grouped: IndexMap<&str, DestinationVisits> = IndexMap::new();

    for visit in visits {
        let key = destination_key(&visit.destination_name);
        let entry = grouped.entry(key).or_insert_with(|| DestinationVisits {
            name: key.to_string(),
            category: category_label(visit.category.as_ref()),
            municipality: municipality_label(visit.municipality.as_deref()),
            visits: 0,
            confirmed: 0,
            intents: 0,
        });

        entry.visits += 1;
        if visit.visit_type.is_confirmed() {
            entry.confirmed += 1;
        }
    }

    let rows = grouped
        .into_values()
        .map(|mut row| {
            row.intents = row.visits - row.confirmed;
            row
        })
        .collect();

    rank(rows, |d| d.visits, limit)
}

/// Rank destinations by confirmed visits only.
///
/// Non-confirmed events in the input are ignored, so callers may pass an
/// unfiltered visit list.
pub fn most_confirmed(visits: &[VisitEvent], limit: usize) -> Vec<ConfirmedVisits> {
    let mut grouped: IndexMap<&str, ConfirmedVisits> = IndexMap::new();

    for visit in visits.iter().filter(|v| v.visit_type.is_confirmed()) {
        let key = destination_key(&visit.destination_name);
        grouped
            .entry(key)
            .or_insert_with(|| ConfirmedVisits {
                name: key.to_string(),
                category: category_label(visit.category.as_ref()),
                municipality: municipality_label(visit.municipality.as_deref()),
                visits: 0,
            })
            .visits += 1;
    }

    rank(grouped.into_values().collect(), |d| d.visits, limit)
}

fn count_by_category<'a>(
    categories: impl Iterator<Item = Option<&'a Category>>,
) -> Vec<CategoryCount> {
    let mut counts: IndexMap<String, usize> = IndexMap::new();

    for category in categories {
        *counts.entry(category_label(category)).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(name, count)| CategoryCount { name, count })
        .collect()
}

/// Count views per category, in first-seen order.
pub fn views_by_category(views: &[ViewEvent]) -> Vec<CategoryCount> {
    count_by_category(views.iter().map(|v| v.category.as_ref()))
}

/// Count visits per category, in first-seen order.
pub fn visits_by_category(visits: &[VisitEvent]) -> Vec<CategoryCount> {
    count_by_category(visits.iter().map(|v| v.category.as_ref()))
}

/// Each category's share of total views.
pub fn category_shares(views: &[ViewEvent]) -> Vec<CategoryShare> {
    let total = views.len();

    views_by_category(views)
        .into_iter()
        .map(|c| CategoryShare {
            share: share_of(c.count, total),
            views: c.count,
            name: c.name,
        })
        .collect()
}

fn stat_entry<'m, 'a>(
    grouped: &'m mut IndexMap<Option<&'a Category>, CategoryStat>,
    category: Option<&'a Category>,
) -> &'m mut CategoryStat {
    grouped.entry(category).or_insert_with(|| CategoryStat {
        name: category_label(category),
        destination_count: 0,
        total_views: 0,
        total_visits: 0,
        confirmed: 0,
        intents: 0,
    })
}

/// One row per distinct category across destinations, views and visits,
/// ranked by total views.
///
/// Categories are grouped on the canonical [`Category`], so a code and its
/// display label always land in the same row.
pub fn category_rollup(
    destinations: &[Destination],
    views: &[ViewEvent],
    visits: &[VisitEvent],
) -> Vec<CategoryStat> {
    let mut grouped: IndexMap<Option<&Category>, CategoryStat> = IndexMap::new();

    for destination in destinations {
        stat_entry(&mut grouped, destination.category.as_ref()).destination_count += 1;
    }

    for view in views {
        stat_entry(&mut grouped, view.category.as_ref()).total_views += 1;
    }

    for visit in visits {
        let stat = stat_entry(&mut grouped, visit.category.as_ref());
        stat.total_visits += 1;
        if visit.visit_type.is_confirmed() {
            stat.confirmed += 1;
        }
    }

    let rows = grouped
        .into_values()
        .map(|mut stat| {
            stat.intents = stat.total_visits - stat.confirmed;
            stat
        })
        .collect();

    rank(rows, |s| s.total_views, usize::MAX)
}

/// Number of distinct categories among destinations (uncategorized ones
/// are not counted).
pub fn distinct_categories(destinations: &[Destination]) -> usize {
    destinations
        .iter()
        .filter_map(|d| d.category.as_ref())
        .collect::<std::collections::HashSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VisitType;
    use chrono::{Duration, TimeZone, Utc};

    fn view(name: &str, category: Option<Category>, minutes: i64) -> ViewEvent {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        ViewEvent::new(name, category, Some("Naga"), base + Duration::minutes(minutes))
    }

    fn visit(name: &str, category: Option<Category>, visit_type: VisitType) -> VisitEvent {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        VisitEvent::new(name, category, Some("Pili"), at, visit_type)
    }

    #[test]
    fn test_most_viewed_scenario() {
        let views = vec![
            view("Caramoan Islands", Some(Category::Nature), 0),
            view("CWC Watersports", Some(Category::Resorts), 1),
            view("Caramoan Islands", Some(Category::Nature), 2),
            view("CWC Watersports", Some(Category::Resorts), 3),
            view("Caramoan Islands", Some(Category::Nature), 4),
        ];

        let top = most_viewed(&views, 5);

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "Caramoan Islands");
        assert_eq!(top[0].views, 3);
        assert_eq!(top[0].category, "Nature & Adventure");
        assert_eq!(top[1].name, "CWC Watersports");
        assert_eq!(top[1].views, 2);
    }

    #[test]
    fn test_most_viewed_conserves_view_count() {
        let names = ["A", "B", "C", "A", "", "B", "A", "D"];
        let views: Vec<_> = names
            .iter()
            .enumerate()
            .map(|(i, n)| view(n, None, i as i64))
            .collect();

        let ranked = most_viewed(&views, usize::MAX);
        let total: usize = ranked.iter().map(|d| d.views).sum();

        assert_eq!(total, views.len());
        assert!(ranked.iter().any(|d| d.name == UNKNOWN));
    }

    #[test]
    fn test_ranking_ties_keep_first_seen_order() {
        let views = vec![
            view("Naga Cathedral", None, 0),
            view("Mt. Isarog", None, 1),
            view("Bicol Delicacies", None, 2),
            view("Mt. Isarog", None, 3),
            view("Naga Cathedral", None, 4),
            view("Bicol Delicacies", None, 5),
        ];

        let top = most_viewed(&views, 10);
        let names: Vec<_> = top.iter().map(|d| d.name.as_str()).collect();

        assert_eq!(names, vec!["Naga Cathedral", "Mt. Isarog", "Bicol Delicacies"]);
    }

    #[test]
    fn test_top_n_truncates() {
        let views: Vec<_> = (0..20).map(|i| view(&format!("D{}", i), None, i)).collect();
        assert_eq!(most_viewed(&views, 5).len(), 5);
        assert!(most_viewed(&[], 5).is_empty());
    }

    #[test]
    fn test_missing_metadata_becomes_unknown() {
        let views = vec![ViewEvent::new(
            "Hidden Falls",
            None,
            None,
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        )];

        let top = most_viewed(&views, 1);
        assert_eq!(top[0].category, UNKNOWN);
        assert_eq!(top[0].municipality, UNKNOWN);
    }

    #[test]
    fn test_most_visited_splits_confirmed_and_intents() {
        let mut visits = vec![
            visit("Mt. Isarog", Some(Category::Nature), VisitType::Confirmed),
            visit("Mt. Isarog", Some(Category::Nature), VisitType::Confirmed),
        ];
        for _ in 0..3 {
            visits.push(visit("Mt. Isarog", Some(Category::Nature), VisitType::Navigation));
        }

        let top = most_visited(&visits, 10);

        assert_eq!(top.len(), 1);
        assert_eq!(top[0].visits, 5);
        assert_eq!(top[0].confirmed, 2);
        assert_eq!(top[0].intents, 3);
    }

    #[test]
    fn test_intents_never_negative() {
        let visits = vec![
            visit("A", None, VisitType::Confirmed),
            visit("B", None, VisitType::MapsView),
            visit("A", None, VisitType::Other("share".to_string())),
            visit("C", None, VisitType::Confirmed),
        ];

        for row in most_visited(&visits, 10) {
            assert!(row.confirmed <= row.visits);
            assert_eq!(row.intents, row.visits - row.confirmed);
        }
    }

    #[test]
    fn test_most_confirmed_ignores_intents() {
        let visits = vec![
            visit("Caramoan Islands", None, VisitType::Navigation),
            visit("Caramoan Islands", None, VisitType::Navigation),
            visit("CWC Watersports", None, VisitType::Confirmed),
        ];

        let top = most_confirmed(&visits, 10);

        assert_eq!(top.len(), 1);
        assert_eq!(top[0].name, "CWC Watersports");
        assert_eq!(top[0].visits, 1);
    }

    #[test]
    fn test_category_shares_sum_to_hundred() {
        let views = vec![
            view("A", Some(Category::Nature), 0),
            view("B", Some(Category::Food), 1),
            view("C", Some(Category::Food), 2),
            view("D", None, 3),
            view("E", Some(Category::Heritage), 4),
            view("F", Some(Category::Nature), 5),
            view("G", Some(Category::Nature), 6),
        ];

        let shares = category_shares(&views);
        let total: f64 = shares.iter().map(|s| s.share).sum();

        assert!((total - 100.0).abs() < 1e-9);
        assert_eq!(shares[0].name, "Nature & Adventure");
        assert_eq!(shares[0].views, 3);
    }

    #[test]
    fn test_category_shares_empty_input() {
        assert!(category_shares(&[]).is_empty());
        assert_eq!(share_of(0, 0), 0.0);
        assert!(share_of(5, 0).is_finite());
    }

    #[test]
    fn test_visits_by_category_first_seen_order() {
        let visits = vec![
            visit("A", Some(Category::Resorts), VisitType::Confirmed),
            visit("B", Some(Category::Food), VisitType::Navigation),
            visit("C", Some(Category::Food), VisitType::Navigation),
        ];

        let counts = visits_by_category(&visits);

        assert_eq!(counts[0].name, "Resort & Recreation");
        assert_eq!(counts[0].count, 1);
        assert_eq!(counts[1].name, "Food & Dining");
        assert_eq!(counts[1].count, 2);
    }

    #[test]
    fn test_category_rollup_merges_code_and_label() {
        let destinations = vec![
            Destination {
                name: "Caramoan Islands".to_string(),
                category: Category::parse("nature"),
                municipality: Some("Caramoan".to_string()),
            },
            Destination {
                name: "Mt. Isarog".to_string(),
                category: Category::parse("Nature & Adventure"),
                municipality: Some("Pili".to_string()),
            },
            Destination {
                name: "CWC Watersports".to_string(),
                category: Category::parse("resorts"),
                municipality: Some("Pili".to_string()),
            },
        ];
        let views = vec![
            view("CWC Watersports", Some(Category::Resorts), 0),
            view("Caramoan Islands", Some(Category::Nature), 1),
            view("Mt. Isarog", Some(Category::Nature), 2),
        ];
        let visits = vec![
            visit("Mt. Isarog", Some(Category::Nature), VisitType::Confirmed),
            visit("Mt. Isarog", Some(Category::Nature), VisitType::MapsView),
        ];

        let rollup = category_rollup(&destinations, &views, &visits);

        assert_eq!(rollup.len(), 2);
        assert_eq!(rollup[0].name, "Nature & Adventure");
        assert_eq!(rollup[0].destination_count, 2);
        assert_eq!(rollup[0].total_views, 2);
        assert_eq!(rollup[0].total_visits, 2);
        assert_eq!(rollup[0].confirmed, 1);
        assert_eq!(rollup[0].intents, 1);
        assert_eq!(rollup[1].name, "Resort & Recreation");
        assert_eq!(rollup[1].destination_count, 1);
    }

    #[test]
    fn test_distinct_categories() {
        let destinations = vec![
            Destination {
                name: "A".to_string(),
                category: Some(Category::Food),
                municipality: None,
            },
            Destination {
                name: "B".to_string(),
                category: Some(Category::Food),
                municipality: None,
            },
            Destination {
                name: "C".to_string(),
                category: None,
                municipality: None,
            },
        ];

        assert_eq!(distinct_categories(&destinations), 1);
    }
}
