//! Monthly trend buckets.
//!
//! Views and visits are merged into one keyspace of calendar months in the
//! display time zone and returned oldest first.

use crate::models::{MonthKey, MonthlyTrend, ViewEvent, VisitEvent};
use chrono::{DateTime, FixedOffset, Months, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What to do with months inside the range that have no events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    /// Only months with at least one event are returned.
    #[default]
    Omit,
    /// Months between the first and last bucket are emitted with zero counts.
    ZeroFill,
}

/// Lower bound of a trailing window of `months` calendar months.
pub fn trend_window_start(now: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(months))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Bucket views and visits by month.
pub fn monthly_trends(
    views: &[ViewEvent],
    visits: &[VisitEvent],
    offset: FixedOffset,
    gaps: GapPolicy,
) -> Vec<MonthlyTrend> {
    // BTreeMap keyed on (year, month) keeps buckets in calendar order
    let mut buckets: BTreeMap<MonthKey, (usize, usize)> = BTreeMap::new();

    for view in views {
        buckets
            .entry(MonthKey::from_timestamp(view.viewed_at, offset))
            .or_default()
            .0 += 1;
    }

    for visit in visits {
        buckets
            .entry(MonthKey::from_timestamp(visit.visited_at, offset))
            .or_default()
            .1 += 1;
    }

    if gaps == GapPolicy::ZeroFill {
        fill_gaps(&mut buckets);
    }

    buckets
        .into_iter()
        .map(|(key, (views, visits))| MonthlyTrend {
            month: key.label(),
            year: key.year,
            month_number: key.month,
            views,
            visits,
        })
        .collect()
}

fn fill_gaps(buckets: &mut BTreeMap<MonthKey, (usize, usize)>) {
    let (first, last) = match (buckets.keys().next(), buckets.keys().next_back()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return,
    };

    let mut key = first;
    while key < last {
        buckets.entry(key).or_default();
        key = key.next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VisitType;
    use chrono::TimeZone;

    fn manila() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    fn view_at(y: i32, m: u32, d: u32) -> ViewEvent {
        ViewEvent::new(
            "Caramoan Islands",
            None,
            None,
            Utc.with_ymd_and_hms(y, m, d, 4, 0, 0).unwrap(),
        )
    }

    fn visit_at(y: i32, m: u32, d: u32) -> VisitEvent {
        VisitEvent::new(
            "Caramoan Islands",
            None,
            None,
            Utc.with_ymd_and_hms(y, m, d, 4, 0, 0).unwrap(),
            VisitType::Confirmed,
        )
    }

    #[test]
    fn test_buckets_sorted_across_year_boundary() {
        // Input is deliberately newest-first, as the store returns it
        let views = vec![view_at(2026, 2, 3), view_at(2026, 1, 9), view_at(2025, 12, 20)];
        let visits = vec![visit_at(2025, 11, 2)];

        let trends = monthly_trends(&views, &visits, manila(), GapPolicy::Omit);
        let labels: Vec<_> = trends.iter().map(|t| t.month.as_str()).collect();

        assert_eq!(labels, vec!["Nov 2025", "Dec 2025", "Jan 2026", "Feb 2026"]);
        for pair in trends.windows(2) {
            assert!((pair[0].year, pair[0].month_number) < (pair[1].year, pair[1].month_number));
        }
    }

    #[test]
    fn test_views_and_visits_share_keyspace() {
        let views = vec![view_at(2026, 3, 1), view_at(2026, 3, 2)];
        let visits = vec![visit_at(2026, 3, 5), visit_at(2026, 4, 1)];

        let trends = monthly_trends(&views, &visits, manila(), GapPolicy::Omit);

        assert_eq!(trends.len(), 2);
        assert_eq!((trends[0].views, trends[0].visits), (2, 1));
        assert_eq!((trends[1].views, trends[1].visits), (0, 1));
    }

    #[test]
    fn test_gaps_omitted_by_default() {
        let views = vec![view_at(2026, 1, 10), view_at(2026, 4, 10)];

        let trends = monthly_trends(&views, &[], manila(), GapPolicy::default());

        assert_eq!(trends.len(), 2);
    }

    #[test]
    fn test_zero_fill_inserts_empty_months() {
        let views = vec![view_at(2025, 11, 10), view_at(2026, 2, 10)];

        let trends = monthly_trends(&views, &[], manila(), GapPolicy::ZeroFill);
        let labels: Vec<_> = trends.iter().map(|t| t.month.as_str()).collect();

        assert_eq!(labels, vec!["Nov 2025", "Dec 2025", "Jan 2026", "Feb 2026"]);
        assert_eq!(trends[1].views, 0);
        assert_eq!(trends[2].visits, 0);
    }

    #[test]
    fn test_empty_input() {
        assert!(monthly_trends(&[], &[], manila(), GapPolicy::ZeroFill).is_empty());
    }

    #[test]
    fn test_trend_window_start() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap();
        let start = trend_window_start(now, 6);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 4, 16, 0, 0, 0).unwrap());
    }
}
