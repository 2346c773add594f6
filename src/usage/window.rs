use super::UsageRecord;
use chrono::{DateTime, Utc};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Whole days elapsed between `timestamp` and `now`, rounded towards negative infinity.
pub fn days_ago(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - timestamp).num_milliseconds().div_euclid(MILLIS_PER_DAY)
}

/// Keeps records at most `days` whole days old. A record exactly `days * 24h`
/// old is kept; timestamps after `now` are always kept.
pub fn filter_by_days(
    records: &[UsageRecord],
    days: i64,
    now: DateTime<Utc>,
) -> Vec<&UsageRecord> {
    records
        .iter()
        .filter(|record| days_ago(record.timestamp, now) <= days)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn record_at(timestamp: DateTime<Utc>) -> UsageRecord {
        UsageRecord {
            timestamp,
            cost: 1.0,
            tokens_in: 0,
            tokens_out: 0,
            model: "m".to_string(),
            tag: None,
            session_key: "s".to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn zero_day_window_includes_now() {
        let records = vec![record_at(now())];
        assert_eq!(filter_by_days(&records, 0, now()).len(), 1);
    }

    #[test]
    fn boundary_is_inclusive_and_floored() {
        let records = vec![
            record_at(now() - ChronoDuration::days(7)),
            record_at(now() - ChronoDuration::days(8) + ChronoDuration::milliseconds(1)),
            record_at(now() - ChronoDuration::days(8)),
        ];

        let kept = filter_by_days(&records, 7, now());
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].timestamp, records[0].timestamp);
        assert_eq!(kept[1].timestamp, records[1].timestamp);
    }

    #[test]
    fn future_records_are_kept() {
        let records = vec![record_at(now() + ChronoDuration::hours(3))];
        assert_eq!(days_ago(records[0].timestamp, now()), -1);
        assert_eq!(filter_by_days(&records, 0, now()).len(), 1);
    }
}
