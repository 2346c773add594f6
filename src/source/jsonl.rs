use super::{SourceError, UsageSource, preview};
use crate::usage::UsageRecord;
use async_trait::async_trait;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

/// Reads a JSON-lines log, one record per line.
pub struct JsonlSource {
    path: PathBuf,
}

impl JsonlSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl UsageSource for JsonlSource {
    fn describe(&self) -> String {
        format!("jsonl:{}", self.path.display())
    }

    async fn load(&self) -> Result<Vec<UsageRecord>, SourceError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "usage log not found");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };
        Ok(parse_jsonl(&String::from_utf8_lossy(&bytes)))
    }
}

/// Parses every non-blank, non-comment line, skipping the ones that fail.
pub fn parse_jsonl(content: &str) -> Vec<UsageRecord> {
    let mut records = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match UsageRecord::parse_line(trimmed) {
            Ok(record) => records.push(record),
            Err(err) => {
                tracing::warn!(
                    line = idx + 1,
                    error = %err,
                    preview = %preview(trimmed),
                    "skipping malformed usage line"
                );
            }
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::NamedTempFile;

    #[test]
    fn skips_blank_comment_and_malformed_lines() {
        let content = r#"
# exported by the gateway
{"timestamp":"2026-02-20T10:00:00Z","cost":0.2,"model":"a","sessionKey":"s1"}
{"timestamp":"2026-02-20T10:05:00Z","cost":
{"timestamp":"2026-02-20T10:06:00Z","model":"a"}

{"timestamp":"2026-02-20T10:10:00Z","cost":0.3,"model":"b","session_key":"s2"}
"#;

        let records = parse_jsonl(content);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].session_key, "s1");
        assert_eq!(records[1].session_key, "s2");
    }

    #[tokio::test]
    async fn reads_records_from_disk() {
        let file = NamedTempFile::new().unwrap();
        fs::write(
            file.path(),
            concat!(
                r#"{"timestamp":"2026-02-20T10:00:00Z","cost":1.5,"tokens_in":10,"tokens_out":5}"#,
                "\n",
                "garbage\n",
                r#"{"timestamp":"2026-02-21T10:00:00Z","cost":0.5}"#,
                "\n",
            ),
        )
        .unwrap();

        let source = JsonlSource::new(file.path());
        let records = source.load().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].total_tokens(), 15);
    }

    #[tokio::test]
    async fn missing_file_is_an_empty_log() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonlSource::new(dir.path().join("absent.jsonl"));
        assert!(source.load().await.unwrap().is_empty());
        assert!(source.fetch_records().await.is_empty());
    }

    #[tokio::test]
    async fn unreadable_path_resolves_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonlSource::new(dir.path());
        assert!(matches!(source.load().await, Err(SourceError::Unavailable(_))));
        assert!(source.fetch_records().await.is_empty());
    }
}
