use super::{UsageRecord, round_cost};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

pub const DEFAULT_RECENT_SESSIONS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_key: String,
    pub cost: f64,
    pub tokens: u64,
    pub count: u64,
    pub last_timestamp: DateTime<Utc>,
    /// Distinct explicit tags, in first-seen order. Untagged records add nothing.
    pub tags: Vec<String>,
}

impl SessionSummary {
    fn new(record: &UsageRecord) -> Self {
        Self {
            session_key: record.session_key.clone(),
            cost: 0.0,
            tokens: 0,
            count: 0,
            last_timestamp: record.timestamp,
            tags: Vec::new(),
        }
    }

    fn add(&mut self, record: &UsageRecord) {
        self.cost += record.cost;
        self.tokens = self.tokens.saturating_add(record.total_tokens());
        self.count += 1;
        if record.timestamp > self.last_timestamp {
            self.last_timestamp = record.timestamp;
        }
        if let Some(tag) = record.tag.as_deref() {
            if !self.tags.iter().any(|seen| seen == tag) {
                self.tags.push(tag.to_string());
            }
        }
    }
}

/// Per-session totals for the `limit` sessions with the most recent activity.
pub fn recent_sessions(records: &[UsageRecord], limit: usize) -> Vec<SessionSummary> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut sessions: Vec<SessionSummary> = Vec::new();

    for record in records {
        let slot = *index
            .entry(record.session_key.as_str())
            .or_insert_with(|| {
                sessions.push(SessionSummary::new(record));
                sessions.len() - 1
            });
        sessions[slot].add(record);
    }

    for session in &mut sessions {
        session.cost = round_cost(session.cost);
    }
    sessions.sort_by(|a, b| b.last_timestamp.cmp(&a.last_timestamp));
    sessions.truncate(limit);
    sessions
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 10, 8, 0, 0).unwrap()
    }

    fn record(session: &str, minutes: i64, cost: f64, tag: Option<&str>) -> UsageRecord {
        UsageRecord {
            timestamp: base() + ChronoDuration::minutes(minutes),
            cost,
            tokens_in: 100,
            tokens_out: 50,
            model: "m".to_string(),
            tag: tag.map(String::from),
            session_key: session.to_string(),
        }
    }

    #[test]
    fn orders_by_latest_activity() {
        let records = vec![
            record("old", 0, 5.0, None),
            record("new", 10, 0.1, None),
            record("old", 5, 1.0, None),
            record("newest", 30, 0.2, None),
        ];

        let sessions = recent_sessions(&records, DEFAULT_RECENT_SESSIONS);
        let keys: Vec<_> = sessions.iter().map(|s| s.session_key.as_str()).collect();
        assert_eq!(keys, vec!["newest", "new", "old"]);
        assert_eq!(sessions[2].cost, 6.0);
        assert_eq!(sessions[2].count, 2);
        assert_eq!(sessions[2].tokens, 300);
        assert_eq!(sessions[2].last_timestamp, base() + ChronoDuration::minutes(5));
    }

    #[test]
    fn collects_distinct_tags_in_first_seen_order() {
        let records = vec![
            record("s", 0, 0.1, Some("review")),
            record("s", 1, 0.1, None),
            record("s", 2, 0.1, Some("research")),
            record("s", 3, 0.1, Some("review")),
        ];

        let sessions = recent_sessions(&records, 5);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].tags, vec!["review", "research"]);
    }

    #[test]
    fn respects_limit() {
        let records: Vec<_> = (0..30)
            .map(|i| record(&format!("s{i}"), i, 0.01, None))
            .collect();

        let sessions = recent_sessions(&records, 20);
        assert_eq!(sessions.len(), 20);
        assert_eq!(sessions[0].session_key, "s29");
        assert_eq!(sessions[19].session_key, "s10");
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let sessions = recent_sessions(&[record("abc", 0, 0.123456, Some("t"))], 1);
        let value = serde_json::to_value(&sessions[0]).unwrap();
        assert_eq!(value["sessionKey"], "abc");
        assert_eq!(value["cost"], 0.1235);
        assert_eq!(value["lastTimestamp"], "2026-02-10T08:00:00Z");
    }
}
