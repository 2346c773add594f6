use super::{SourceError, UsageSource};
use crate::usage::UsageRecord;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};

const DEMO_MODELS: &[&str] = &["claude-sonnet-4", "claude-haiku-3.5", "gpt-4.1-mini"];
const DEMO_TAGS: &[Option<&str>] = &[Some("research"), Some("heartbeat"), None, Some("review")];
const DEMO_SESSIONS: &[&str] = &["main-direct", "observer", "reflector", "self-audit", "cron"];
const DEMO_RECORDS: i64 = 48;

/// Serves a fixed, in-memory record set.
pub struct MockSource {
    records: Vec<UsageRecord>,
}

impl MockSource {
    pub fn new(records: Vec<UsageRecord>) -> Self {
        Self { records }
    }

    /// A deterministic spread of records over the five weeks before `now`.
    pub fn demo(now: DateTime<Utc>) -> Self {
        let records = (0..DEMO_RECORDS)
            .map(|i| {
                let idx = i as usize;
                let tokens_in = 800 + (i as u64 * 137) % 4_000;
                let tokens_out = 120 + (i as u64 * 53) % 900;
                UsageRecord {
                    timestamp: now - ChronoDuration::hours(i * 17),
                    cost: (tokens_in * 3 + tokens_out * 15) as f64 / 1_000_000.0,
                    tokens_in,
                    tokens_out,
                    model: DEMO_MODELS[idx % DEMO_MODELS.len()].to_string(),
                    tag: DEMO_TAGS[idx % DEMO_TAGS.len()].map(String::from),
                    session_key: DEMO_SESSIONS[(idx / 3) % DEMO_SESSIONS.len()].to_string(),
                }
            })
            .collect();
        Self::new(records)
    }
}

#[async_trait]
impl UsageSource for MockSource {
    fn describe(&self) -> String {
        format!("mock:{} records", self.records.len())
    }

    async fn load(&self) -> Result<Vec<UsageRecord>, SourceError> {
        Ok(self.records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::build_summary;
    use chrono::TimeZone;

    #[tokio::test]
    async fn demo_data_spans_every_window() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let source = MockSource::demo(now);
        let records = source.fetch_records().await;
        assert_eq!(records.len(), DEMO_RECORDS as usize);

        let summary = build_summary(&records, now);
        assert!(summary.week.entries > 0);
        assert!(summary.week.entries < summary.month.entries);
        assert!(summary.month.entries < summary.all_time.entries);
        assert_eq!(summary.all_time.total_sessions, DEMO_SESSIONS.len());
    }

    #[tokio::test]
    async fn returns_the_records_it_was_given() {
        let source = MockSource::new(Vec::new());
        assert!(source.load().await.unwrap().is_empty());
        assert_eq!(source.describe(), "mock:0 records");
    }
}
