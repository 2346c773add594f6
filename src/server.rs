use crate::{
    config::{AppConfig, DisplayConfig},
    errors::ApiError,
    research::{Document, ProjectDetail, ProjectSummary, ResearchLibrary},
    source::UsageSource,
    usage::{
        ModelCost, SessionSummary, SessionTimeline, Summary, TagCost, build_summary,
        build_timelines, cost_by_model, cost_by_tag, recent_sessions,
    },
};
use anyhow::{Context, Result, anyhow};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use std::{net::SocketAddr, path::Path as FsPath, sync::Arc};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

#[derive(Clone)]
pub struct DashboardState {
    source: Arc<dyn UsageSource>,
    research: Arc<ResearchLibrary>,
    display: DisplayConfig,
}

impl DashboardState {
    pub fn new(
        source: Arc<dyn UsageSource>,
        research: ResearchLibrary,
        display: DisplayConfig,
    ) -> Self {
        Self {
            source,
            research: Arc::new(research),
            display,
        }
    }
}

pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    join: JoinHandle<Result<()>>,
}

pub async fn spawn(config: &AppConfig, state: DashboardState) -> Result<ServerHandle> {
    let addr: SocketAddr = config
        .server
        .listen_addr
        .parse()
        .with_context(|| "failed to parse listen_addr")?;

    let router = router(state, &config.server.static_dir);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind dashboard listener on {addr}"))?;
    let local_addr = listener.local_addr()?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let join = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .map_err(|err| anyhow!(err))
    });

    tracing::info!(listen = %local_addr, static_dir = %config.server.static_dir.display(), "dashboard listener started");

    Ok(ServerHandle {
        local_addr,
        shutdown: Some(shutdown_tx),
        join,
    })
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.join.await {
            Ok(result) => result,
            Err(err) => Err(anyhow!(err)),
        }
    }
}

pub fn router(state: DashboardState, static_dir: &FsPath) -> Router {
    let static_service =
        ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .route("/health", get(health))
        .route("/api/summary", get(summary))
        .route("/api/cost-by-model", get(model_costs))
        .route("/api/cost-by-tag", get(tag_costs))
        .route("/api/sessions", get(sessions))
        .route("/api/timeline", get(timeline))
        .route("/api/projects", get(projects))
        .route("/api/projects/:project_id", get(project))
        .route("/api/documents/:project_id/*doc", get(document))
        .route("/api/download/:project_id/*doc", get(download))
        .with_state(state)
        .fallback_service(static_service)
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Default, Deserialize)]
struct SessionsQuery {
    limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct TimelineQuery {
    days: Option<i64>,
    top: Option<usize>,
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "timestamp": Utc::now() }))
}

async fn summary(State(state): State<DashboardState>) -> Json<Summary> {
    let records = state.source.fetch_records().await;
    Json(build_summary(&records, Utc::now()))
}

async fn model_costs(State(state): State<DashboardState>) -> Json<Vec<ModelCost>> {
    let records = state.source.fetch_records().await;
    Json(cost_by_model(&records))
}

async fn tag_costs(State(state): State<DashboardState>) -> Json<Vec<TagCost>> {
    let records = state.source.fetch_records().await;
    Json(cost_by_tag(&records))
}

async fn sessions(
    State(state): State<DashboardState>,
    Query(query): Query<SessionsQuery>,
) -> Json<Vec<SessionSummary>> {
    let limit = query.limit.unwrap_or(state.display.recent_sessions_limit);
    let records = state.source.fetch_records().await;
    Json(recent_sessions(&records, limit))
}

async fn timeline(
    State(state): State<DashboardState>,
    Query(query): Query<TimelineQuery>,
) -> Json<Vec<SessionTimeline>> {
    let days = query.days.unwrap_or(state.display.timeline_window_days);
    let top = query.top.unwrap_or(state.display.timeline_top_n);
    let records = state.source.fetch_records().await;
    Json(build_timelines(&records, days, top, Utc::now()))
}

async fn projects(
    State(state): State<DashboardState>,
) -> Result<Json<Vec<ProjectSummary>>, ApiError> {
    let research = state.research.clone();
    let projects = blocking(move || research.list_projects()).await??;
    Ok(Json(projects))
}

async fn project(
    State(state): State<DashboardState>,
    Path(project_id): Path<String>,
) -> Result<Json<ProjectDetail>, ApiError> {
    let research = state.research.clone();
    let detail = blocking(move || research.project(&project_id)).await??;
    Ok(Json(detail))
}

async fn document(
    State(state): State<DashboardState>,
    Path((project_id, doc)): Path<(String, String)>,
) -> Result<Json<Document>, ApiError> {
    let research = state.research.clone();
    let document = blocking(move || research.document(&project_id, &doc)).await??;
    Ok(Json(document))
}

async fn download(
    State(state): State<DashboardState>,
    Path((project_id, doc)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let research = state.research.clone();
    let download = blocking(move || research.download(&project_id, &doc)).await??;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        download.file_name.replace('"', "")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        download.body,
    ))
}

/// Runs filesystem work off the async executor.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| ApiError::internal(format!("research task failed: {err}")))
}
