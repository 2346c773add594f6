//! Adapters that supply usage records from a file, a database, or memory.
//!
//! Every adapter funnels raw entries through [`UsageRecord::from_value`] so the
//! aggregation layer only ever sees one record shape.

mod jsonl;
mod mock;
mod sqlite;
mod supabase;

pub use jsonl::JsonlSource;
pub use mock::MockSource;
pub use sqlite::SqliteSource;
pub use supabase::SupabaseSource;

use crate::{
    config::{SourceConfig, SourceKind},
    usage::UsageRecord,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use thiserror::Error;

const PREVIEW_CHARS: usize = 50;

#[derive(Debug, Error)]
pub enum SourceError {
    /// Nothing could be read from the backing store.
    #[error("usage source unavailable: {0}")]
    Unavailable(String),
    /// A single entry could not be turned into a record.
    #[error("malformed usage record: {0}")]
    MalformedRecord(String),
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl From<sqlx::Error> for SourceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

#[async_trait]
pub trait UsageSource: Send + Sync {
    /// Short human-readable label used in logs.
    fn describe(&self) -> String;

    /// Reads every record, skipping malformed entries.
    async fn load(&self) -> Result<Vec<UsageRecord>, SourceError>;

    /// Like [`UsageSource::load`], but an unavailable source yields no records
    /// instead of an error.
    async fn fetch_records(&self) -> Vec<UsageRecord> {
        match self.load().await {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(source = %self.describe(), error = %err, "usage source unavailable, serving empty data");
                Vec::new()
            }
        }
    }
}

pub fn from_config(config: &SourceConfig) -> Result<Arc<dyn UsageSource>> {
    let source: Arc<dyn UsageSource> = match config.kind {
        SourceKind::Jsonl => Arc::new(JsonlSource::new(&config.log_path)),
        SourceKind::Sqlite => Arc::new(
            SqliteSource::new(&config.database_path, &config.table)
                .with_context(|| "failed to configure sqlite usage source")?,
        ),
        SourceKind::Supabase => {
            let url = config
                .supabase_url
                .as_deref()
                .context("source.supabase_url is required for the supabase source")?;
            Arc::new(
                SupabaseSource::new(
                    url,
                    &config.table,
                    config.supabase_key.clone(),
                    Duration::from_secs(config.request_timeout_secs.max(1)),
                )
                .with_context(|| "failed to configure supabase usage source")?,
            )
        }
        SourceKind::Mock => Arc::new(MockSource::demo(Utc::now())),
    };

    tracing::info!(source = %source.describe(), "usage source configured");
    Ok(source)
}

/// Normalizes a batch of JSON objects, dropping the ones that are not records.
fn normalize_values(values: Vec<Value>, origin: &str) -> Vec<UsageRecord> {
    let mut records = Vec::with_capacity(values.len());
    for (position, value) in values.into_iter().enumerate() {
        match UsageRecord::from_value(value) {
            Ok(record) => records.push(record),
            Err(err) => {
                tracing::warn!(origin, position, error = %err, "skipping malformed usage row");
            }
        }
    }
    records
}

fn preview(line: &str) -> String {
    let mut out: String = line.chars().take(PREVIEW_CHARS).collect();
    if line.chars().count() > PREVIEW_CHARS {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Broken;

    #[async_trait]
    impl UsageSource for Broken {
        fn describe(&self) -> String {
            "broken".to_string()
        }

        async fn load(&self) -> Result<Vec<UsageRecord>, SourceError> {
            Err(SourceError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn unavailable_source_resolves_to_empty() {
        assert!(Broken.fetch_records().await.is_empty());
    }

    #[test]
    fn normalize_values_skips_bad_rows() {
        let rows = vec![
            json!({"timestamp": "2026-02-01T00:00:00Z", "cost": 1.0}),
            json!({"cost": 1.0}),
            json!("not an object"),
            json!({"created_at": "2026-02-02T00:00:00Z", "cost": 0.2, "session_key": "x"}),
        ];

        let records = normalize_values(rows, "test");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].session_key, "x");
    }

    #[test]
    fn normalize_values_accepts_postgrest_rows() {
        let rows = vec![
            json!({
                "id": 41,
                "created_at": "2026-02-20T10:00:05.123456+00:00",
                "timestamp": "2026-02-20T09:59:00Z",
                "cost": 0.5,
                "session_key": "main",
                "tokens_in": 10,
                "tokens_out": 4,
            }),
            json!({
                "id": 42,
                "created_at": "2026-02-20T10:02:00+00:00",
                "timestamp": null,
                "cost": "0.25",
                "sessionKey": "side",
            }),
        ];

        let records = normalize_values(rows, "supabase");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].session_key, "main");
        assert_eq!(records[0].total_tokens(), 14);
        assert_eq!(records[1].session_key, "side");
        assert_eq!(records[1].cost, 0.25);
    }

    #[test]
    fn preview_truncates_long_lines() {
        let long = "x".repeat(80);
        assert_eq!(preview(&long).len(), PREVIEW_CHARS + 3);
        assert_eq!(preview("short"), "short");
    }

    #[tokio::test]
    async fn builds_each_configured_kind() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SourceConfig::default();
        config.log_path = dir.path().join("logs.jsonl");
        config.database_path = dir.path().join("usage.db");

        for kind in [SourceKind::Jsonl, SourceKind::Sqlite, SourceKind::Mock] {
            config.kind = kind;
            assert!(from_config(&config).is_ok());
        }

        config.kind = SourceKind::Supabase;
        assert!(from_config(&config).is_err());
        config.supabase_url = Some("http://127.0.0.1:9".to_string());
        assert!(from_config(&config).is_ok());

        config.kind = SourceKind::Sqlite;
        config.table = "logs; DROP TABLE x".to_string();
        assert!(from_config(&config).is_err());
    }
}
