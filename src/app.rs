use crate::{
    config::AppConfig,
    research::ResearchLibrary,
    server::{self, DashboardState},
    source::{self, UsageSource},
    usage,
};
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;

/// High-level application orchestrator.
pub struct App {
    config: AppConfig,
    source: Arc<dyn UsageSource>,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let source = source::from_config(&config.source)?;
        Ok(Self { config, source })
    }

    /// Computes the summary once and returns it as pretty-printed JSON.
    pub async fn summary_json(&self) -> Result<String> {
        let records = self.source.fetch_records().await;
        let summary = usage::build_summary(&records, Utc::now());
        serde_json::to_string_pretty(&summary).context("failed to serialize usage summary")
    }

    pub async fn run(self) -> Result<()> {
        let research = ResearchLibrary::from_config(&self.config.research);
        tracing::debug!(root = %research.root().display(), "research library configured");
        let state = DashboardState::new(self.source.clone(), research, self.config.display.clone());

        let handle = server::spawn(&self.config, state).await?;
        tracing::info!(url = %format!("http://{}", handle.local_addr()), "dashboard ready");

        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for shutdown signal")?;
        tracing::info!("shutdown requested");

        handle.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceKind;
    use serde_json::Value;
    use std::fs;

    #[tokio::test]
    async fn summary_json_reads_configured_source() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("token-logs.jsonl");
        let now = Utc::now().to_rfc3339();
        fs::write(
            &log_path,
            format!(
                "{{\"timestamp\":\"{now}\",\"cost\":0.5,\"sessionKey\":\"a\"}}\nnot json\n{{\"timestamp\":\"{now}\",\"cost\":0.25,\"sessionKey\":\"b\"}}\n"
            ),
        )
        .unwrap();

        let mut config = AppConfig::default();
        config.source.kind = SourceKind::Jsonl;
        config.source.log_path = log_path;

        let app = App::new(config).unwrap();
        let json: Value = serde_json::from_str(&app.summary_json().await.unwrap()).unwrap();
        assert_eq!(json["week"]["entries"], 2);
        assert_eq!(json["allTime"]["totalCost"], 0.75);
        assert_eq!(json["allTime"]["avgCostPerSession"], 0.375);
    }
}
