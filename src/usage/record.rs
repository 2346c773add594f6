use crate::source::SourceError;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};

pub const UNKNOWN_MODEL: &str = "unknown";
pub const UNKNOWN_SESSION: &str = "unknown";
pub const UNTAGGED: &str = "untagged";

const TIMESTAMP_KEYS: &[&str] = &["timestamp", "created_at"];
const SESSION_KEYS: &[&str] = &["sessionKey", "session_key"];
const TOKENS_IN_KEYS: &[&str] = &["tokens_in", "tokensIn", "input_tokens"];
const TOKENS_OUT_KEYS: &[&str] = &["tokens_out", "tokensOut", "output_tokens"];
const NAIVE_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// One logged request, in the canonical shape every source normalizes to.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageRecord {
    pub timestamp: DateTime<Utc>,
    pub cost: f64,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub model: String,
    pub tag: Option<String>,
    pub session_key: String,
}

impl UsageRecord {
    pub fn total_tokens(&self) -> u64 {
        self.tokens_in.saturating_add(self.tokens_out)
    }

    pub fn tag_or_untagged(&self) -> &str {
        self.tag.as_deref().unwrap_or(UNTAGGED)
    }

    /// Parses one JSON-lines entry.
    pub fn parse_line(line: &str) -> Result<Self, SourceError> {
        let value: Value = serde_json::from_str(line)
            .map_err(|err| SourceError::MalformedRecord(err.to_string()))?;
        Self::from_value(value)
    }

    /// Normalizes a loosely shaped JSON object coming from any backend.
    ///
    /// Only `timestamp` and `cost` are required; every other field degrades to
    /// a default instead of rejecting the entry. When a row carries several
    /// spellings of one field, the first name in each key list wins.
    pub fn from_value(value: Value) -> Result<Self, SourceError> {
        let Value::Object(row) = value else {
            return Err(SourceError::MalformedRecord(
                "expected a JSON object".to_string(),
            ));
        };

        let timestamp = first_present(&row, TIMESTAMP_KEYS)
            .and_then(parse_timestamp)
            .ok_or_else(|| SourceError::MalformedRecord("missing or invalid timestamp".into()))?;
        // `null` still counts as a present cost; only an absent key rejects the entry.
        let cost = row
            .get("cost")
            .map(coerce_cost)
            .ok_or_else(|| SourceError::MalformedRecord("missing cost".into()))?;

        Ok(Self {
            timestamp,
            cost,
            tokens_in: coerce_tokens(first_present(&row, TOKENS_IN_KEYS)),
            tokens_out: coerce_tokens(first_present(&row, TOKENS_OUT_KEYS)),
            model: label(row.get("model")).unwrap_or_else(|| UNKNOWN_MODEL.to_string()),
            tag: label(row.get("tag")),
            session_key: label(first_present(&row, SESSION_KEYS))
                .unwrap_or_else(|| UNKNOWN_SESSION.to_string()),
        })
    }
}

/// The value under the first key in `keys` that the row has and that is not `null`.
fn first_present<'a>(row: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| row.get(*key))
        .find(|value| !value.is_null())
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => parse_timestamp_str(text.trim()),
        Value::Number(number) => {
            let millis = number
                .as_i64()
                .or_else(|| number.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))?;
            Utc.timestamp_millis_opt(millis).single()
        }
        _ => None,
    }
}

fn parse_timestamp_str(text: &str) -> Option<DateTime<Utc>> {
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn coerce_cost(value: &Value) -> f64 {
    let cost = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    cost.filter(|c| c.is_finite()).unwrap_or(0.0)
}

fn coerce_tokens(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(number)) => number
            .as_u64()
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f as u64)
            })
            .unwrap_or(0),
        Some(Value::String(text)) => text.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn label(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
