use super::{UsageRecord, round_cost, window::filter_by_days};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

pub const DEFAULT_WINDOW_DAYS: i64 = 30;
pub const DEFAULT_TOP_SESSIONS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub timestamp: DateTime<Utc>,
    /// Running total for the session up to and including this point.
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTimeline {
    pub session_key: String,
    pub points: Vec<TimelinePoint>,
}

/// Cumulative cost curves for sessions active in the trailing window.
///
/// Each point carries the rounded running total, not a rounded delta, so the
/// series always agrees with itself. Sessions are kept in first-seen order and
/// cut to `top_n` without ranking by cost.
pub fn build_timelines(
    records: &[UsageRecord],
    window_days: i64,
    top_n: usize,
    now: DateTime<Utc>,
) -> Vec<SessionTimeline> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut grouped: Vec<(&str, Vec<&UsageRecord>)> = Vec::new();

    for record in filter_by_days(records, window_days, now) {
        let key = record.session_key.as_str();
        let slot = *index.entry(key).or_insert_with(|| {
            grouped.push((key, Vec::new()));
            grouped.len() - 1
        });
        grouped[slot].1.push(record);
    }

    grouped
        .into_iter()
        .take(top_n)
        .map(|(session_key, mut entries)| {
            entries.sort_by_key(|record| record.timestamp);
            let mut running = 0.0;
            let points = entries
                .into_iter()
                .map(|record| {
                    running += record.cost;
                    TimelinePoint {
                        timestamp: record.timestamp,
                        cost: round_cost(running),
                    }
                })
                .collect();
            SessionTimeline {
                session_key: session_key.to_string(),
                points,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
    }

    fn record(session: &str, hours_ago: i64, cost: f64) -> UsageRecord {
        UsageRecord {
            timestamp: now() - ChronoDuration::hours(hours_ago),
            cost,
            tokens_in: 0,
            tokens_out: 0,
            model: "m".to_string(),
            tag: None,
            session_key: session.to_string(),
        }
    }

    #[test]
    fn points_are_sorted_and_cumulative() {
        let records = vec![
            record("a", 1, 0.3),
            record("a", 5, 0.1),
            record("a", 3, 0.2),
        ];

        let timelines = build_timelines(&records, DEFAULT_WINDOW_DAYS, DEFAULT_TOP_SESSIONS, now());
        assert_eq!(timelines.len(), 1);
        let costs: Vec<f64> = timelines[0].points.iter().map(|p| p.cost).collect();
        assert_eq!(costs, vec![0.1, 0.3, 0.6]);
        assert!(
            timelines[0]
                .points
                .windows(2)
                .all(|pair| pair[0].timestamp <= pair[1].timestamp)
        );
    }

    #[test]
    fn rounds_running_total_not_deltas() {
        let records = vec![
            record("a", 3, 0.00004),
            record("a", 2, 0.00004),
            record("a", 1, 0.00004),
        ];

        let timelines = build_timelines(&records, 30, 10, now());
        let costs: Vec<f64> = timelines[0].points.iter().map(|p| p.cost).collect();
        assert_eq!(costs, vec![0.0, 0.0001, 0.0001]);
    }

    #[test]
    fn cumulative_costs_never_decrease() {
        let records: Vec<_> = (0..50)
            .map(|i| record(&format!("s{}", i % 3), (i * 7) % 48, 0.013 * (i % 5) as f64))
            .collect();

        for timeline in build_timelines(&records, 30, 10, now()) {
            assert!(timeline.points.windows(2).all(|pair| pair[0].cost <= pair[1].cost));
        }
    }

    #[test]
    fn drops_records_outside_window() {
        let records = vec![record("old", 24 * 40, 5.0), record("new", 2, 1.0)];

        let timelines = build_timelines(&records, 30, 10, now());
        assert_eq!(timelines.len(), 1);
        assert_eq!(timelines[0].session_key, "new");
    }

    #[test]
    fn truncates_in_first_seen_order() {
        let records = vec![
            record("cheap", 1, 0.01),
            record("pricey", 2, 9.0),
            record("mid", 3, 1.0),
        ];

        let timelines = build_timelines(&records, 30, 2, now());
        let keys: Vec<_> = timelines.iter().map(|t| t.session_key.as_str()).collect();
        assert_eq!(keys, vec!["cheap", "pricey"]);
    }
}
