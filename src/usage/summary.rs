use super::{UsageRecord, round_cost, window::filter_by_days};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

pub const WEEK_DAYS: i64 = 7;
pub const MONTH_DAYS: i64 = 30;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStats {
    pub total_cost: f64,
    pub total_tokens: u64,
    pub total_sessions: usize,
    pub avg_cost_per_session: f64,
    pub entries: usize,
}

impl PeriodStats {
    fn from_records(records: &[&UsageRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let mut total_cost = 0.0;
        let mut total_tokens: u64 = 0;
        let mut sessions: HashSet<&str> = HashSet::new();
        for record in records {
            total_cost += record.cost;
            total_tokens = total_tokens.saturating_add(record.total_tokens());
            sessions.insert(record.session_key.as_str());
        }

        let total_sessions = sessions.len();
        let avg_cost_per_session = if total_sessions > 0 {
            round_cost(total_cost / total_sessions as f64)
        } else {
            0.0
        };

        Self {
            total_cost: round_cost(total_cost),
            total_tokens,
            total_sessions,
            avg_cost_per_session,
            entries: records.len(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub week: PeriodStats,
    pub month: PeriodStats,
    pub all_time: PeriodStats,
}

/// Week, month and all-time rollups, each computed by its own pass over `records`.
pub fn build_summary(records: &[UsageRecord], now: DateTime<Utc>) -> Summary {
    let all: Vec<&UsageRecord> = records.iter().collect();
    Summary {
        week: PeriodStats::from_records(&filter_by_days(records, WEEK_DAYS, now)),
        month: PeriodStats::from_records(&filter_by_days(records, MONTH_DAYS, now)),
        all_time: PeriodStats::from_records(&all),
    }
}
