use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::ai_adapter::{build_client_from_config, DynChatClient};
use crate::ai_command::{
    build_prompt, classify_reply, execute, AiReply, DigestEntry, ManageOutcome,
    ANALYZE_SYSTEM_PROMPT, MANAGE_SYSTEM_PROMPT,
};
use crate::config::ai::AiConfig;
use crate::config::app::AppConfig;
use crate::error::ApiError;
use crate::ingest::{self, fetch::HttpFetcher, types::FeedFetcher};
use crate::sources::{NewSource, Source, SourcePatch, SourceRegistry};

/// Header set on `/api/articles` when sources exist but none produced an article.
pub const FEED_WARNING_HEADER: &str = "x-feed-warning";

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SourceRegistry>,
    pub fetcher: Arc<dyn FeedFetcher>,
    pub ai: DynChatClient,
}

impl AppState {
    pub fn new(
        registry: SourceRegistry,
        fetcher: Arc<dyn FeedFetcher>,
        ai: DynChatClient,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            fetcher,
            ai,
        }
    }

    pub fn from_config(app: &AppConfig, ai: &AiConfig) -> anyhow::Result<Self> {
        let fetcher = HttpFetcher::new(app.fetch_timeout(), app.fetch_max_redirects)?;
        Ok(Self::new(
            SourceRegistry::new(app.sources_path.clone()),
            Arc::new(fetcher),
            build_client_from_config(ai),
        ))
    }
}

/// API routes only.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/status", get(status))
        .route("/api/sources", get(list_sources).post(create_source))
        .route("/api/sources/{id}", put(update_source).delete(delete_source))
        .route("/api/articles", get(list_articles))
        .route("/api/ai/manage", post(ai_manage))
        .route("/api/ai/analyze", post(ai_analyze))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// API routes plus the dashboard's static files.
pub fn app_router(state: AppState, static_dir: &FsPath) -> Router {
    router(state).fallback_service(ServeDir::new(static_dir))
}

async fn status() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "running" }))
}

async fn list_sources(State(state): State<AppState>) -> Result<Json<Vec<Source>>, ApiError> {
    Ok(Json(state.registry.read_all().await?))
}

async fn create_source(
    State(state): State<AppState>,
    Json(body): Json<NewSource>,
) -> Result<(StatusCode, Json<Source>), ApiError> {
    let source = state.registry.create(body).await?;
    Ok((StatusCode::CREATED, Json(source)))
}

async fn update_source(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(patch): Json<SourcePatch>,
) -> Result<Json<Source>, ApiError> {
    Ok(Json(state.registry.update(id, patch).await?))
}

async fn delete_source(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    state.registry.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_articles(State(state): State<AppState>) -> Result<Response, ApiError> {
    // Only the registry read can fail the request; feed problems degrade.
    let sources = state.registry.read_all().await?;
    let agg = ingest::aggregate(&sources, state.fetcher.as_ref()).await;

    let mut resp = Json(agg.articles).into_response();
    if agg.degraded {
        resp.headers_mut()
            .insert(FEED_WARNING_HEADER, HeaderValue::from_static("no-articles"));
    }
    Ok(resp)
}

#[derive(Deserialize)]
struct PromptReq {
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    context: Vec<DigestEntry>,
}

impl PromptReq {
    fn full_prompt(&self) -> Result<String, ApiError> {
        if self.prompt.trim().is_empty() {
            return Err(ApiError::BadRequest("a 'prompt' is required".into()));
        }
        Ok(build_prompt(&self.prompt, &self.context))
    }
}

async fn ai_manage(
    State(state): State<AppState>,
    Json(req): Json<PromptReq>,
) -> Result<Json<ManageOutcome>, ApiError> {
    let prompt = req.full_prompt()?;
    let reply = state.ai.complete(MANAGE_SYSTEM_PROMPT, &prompt).await?;

    match classify_reply(&reply) {
        AiReply::Analysis(analysis) => Ok(Json(ManageOutcome::Analysis { analysis })),
        AiReply::Command(command) => {
            tracing::info!(
                provider = state.ai.provider_name(),
                ?command,
                "executing assistant command"
            );
            Ok(Json(execute(command, &state.registry).await?))
        }
    }
}

async fn ai_analyze(
    State(state): State<AppState>,
    Json(req): Json<PromptReq>,
) -> Result<Json<ManageOutcome>, ApiError> {
    let prompt = req.full_prompt()?;
    let analysis = state.ai.complete(ANALYZE_SYSTEM_PROMPT, &prompt).await?;
    Ok(Json(ManageOutcome::Analysis { analysis }))
}
