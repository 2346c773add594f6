use super::{SourceError, UsageSource, normalize_values, sqlite::validate_table_name};
use crate::usage::UsageRecord;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Reads usage rows from a hosted PostgREST endpoint (Supabase).
pub struct SupabaseSource {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl SupabaseSource {
    pub fn new(
        base_url: &str,
        table: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let table = validate_table_name(table)?;
        let client = Client::builder()
            .user_agent(concat!("usage-dashboard/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: rows_endpoint(base_url, &table),
            api_key: api_key.filter(|key| !key.is_empty()),
        })
    }
}

#[async_trait]
impl UsageSource for SupabaseSource {
    fn describe(&self) -> String {
        format!("supabase:{}", self.endpoint)
    }

    async fn load(&self) -> Result<Vec<UsageRecord>, SourceError> {
        let mut request = self.client.get(&self.endpoint);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let response = request.send().await?.error_for_status()?;
        let body: Value = response.json().await?;
        let Value::Array(rows) = body else {
            return Err(SourceError::Unavailable(
                "expected a JSON array of rows".to_string(),
            ));
        };
        Ok(normalize_values(rows, &self.endpoint))
    }
}

fn rows_endpoint(base_url: &str, table: &str) -> String {
    format!("{}/rest/v1/{}?select=*", base_url.trim_end_matches('/'), table)
}
