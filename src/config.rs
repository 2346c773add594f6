use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub research: ResearchConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else {
            let default_path = PathBuf::from("usage-dashboard.toml");
            if default_path.exists() {
                Self::from_file(&default_path)?
            } else {
                Self::default()
            }
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self =
            toml::from_str(&contents).with_context(|| "failed to parse configuration TOML")?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(addr) = env::var("USAGE_DASHBOARD_LISTEN_ADDR") {
            self.server.listen_addr = addr;
        }
        if let Ok(dir) = env::var("USAGE_DASHBOARD_STATIC_DIR") {
            self.server.static_dir = PathBuf::from(dir);
        }
        if let Ok(kind) = env::var("USAGE_DASHBOARD_SOURCE") {
            self.source.kind = SourceKind::parse(&kind)?;
        }
        if let Ok(log_path) = env::var("USAGE_DASHBOARD_LOG_FILE") {
            self.source.log_path = PathBuf::from(log_path);
        }
        if let Ok(db_path) = env::var("USAGE_DASHBOARD_DB_PATH") {
            self.source.database_path = PathBuf::from(db_path);
        }
        if let Ok(url) = env::var("SUPABASE_URL") {
            self.source.supabase_url = Some(url);
        }
        if let Ok(key) = env::var("SUPABASE_KEY") {
            self.source.supabase_key = Some(key);
        }
        if let Ok(dir) = env::var("USAGE_DASHBOARD_RESEARCH_DIR") {
            self.research.root_dir = PathBuf::from(dir);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Directory holding the browser dashboard; unknown paths fall back to its `index.html`.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            static_dir: default_static_dir(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Jsonl,
    Sqlite,
    Supabase,
    Mock,
}

impl SourceKind {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "jsonl" => Ok(Self::Jsonl),
            "sqlite" => Ok(Self::Sqlite),
            "supabase" => Ok(Self::Supabase),
            "mock" => Ok(Self::Mock),
            other => bail!("unknown usage source kind {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_key: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            log_path: default_log_path(),
            database_path: default_database_path(),
            table: default_table(),
            supabase_url: None,
            supabase_key: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResearchConfig {
    #[serde(default = "default_research_dir")]
    pub root_dir: PathBuf,
    #[serde(default = "default_preview_lines")]
    pub preview_lines: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            root_dir: default_research_dir(),
            preview_lines: default_preview_lines(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_recent_sessions")]
    pub recent_sessions_limit: usize,
    #[serde(default = "default_timeline_window")]
    pub timeline_window_days: i64,
    #[serde(default = "default_timeline_top_n")]
    pub timeline_top_n: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            recent_sessions_limit: default_recent_sessions(),
            timeline_window_days: default_timeline_window(),
            timeline_top_n: default_timeline_top_n(),
        }
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_log_path() -> PathBuf {
    PathBuf::from("token-logs.jsonl")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("usage.db")
}

fn default_table() -> String {
    "token_logs".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_research_dir() -> PathBuf {
    PathBuf::from("research")
}

fn default_preview_lines() -> usize {
    15
}

fn default_recent_sessions() -> usize {
    crate::usage::DEFAULT_RECENT_SESSIONS
}

fn default_timeline_window() -> i64 {
    crate::usage::DEFAULT_WINDOW_DAYS
}

fn default_timeline_top_n() -> usize {
    crate::usage::DEFAULT_TOP_SESSIONS
}
