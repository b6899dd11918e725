use anyhow::Result;
use axum::{extract::{Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use engine::{CorpusMetadata, EngineError, FsCorpus, IndexFormat, IndexPaths, ScoredDocument, ScorerConfig, SearchContext};
use engine::config::DEFAULT_META_TOKEN_CAP;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer, AllowOrigin};
use tower_http::trace::TraceLayer;

const PREVIEW_CHARS: usize = 240;
const MAX_K: usize = 100;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<ScoredDocument>,
}

#[derive(Deserialize)]
pub struct DocParams {
    pub id: String,
}

#[derive(Serialize)]
pub struct DocPreview {
    pub doc_id: String,
    pub url: String,
    pub title: Option<String>,
    /// Meta description, or the start of the page text when there is none.
    pub summary: String,
}

/// Where the server finds its corpus and index.
#[derive(Clone)]
pub struct ServerSettings {
    pub index_dir: PathBuf,
    pub corpus_dir: PathBuf,
    pub format: IndexFormat,
    pub scorer: ScorerConfig,
    /// Required in `X-ADMIN-TOKEN` for admin endpoints; admin is disabled when unset.
    pub admin_token: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    /// Current index snapshot. Reloads build a new context and swap the Arc.
    pub context: Arc<RwLock<Arc<SearchContext>>>,
    pub corpus: FsCorpus,
    pub settings: ServerSettings,
}

impl AppState {
    pub fn snapshot(&self) -> Arc<SearchContext> {
        self.context.read().clone()
    }
}

fn load_context(settings: &ServerSettings, corpus: &FsCorpus) -> engine::Result<SearchContext> {
    let metadata = CorpusMetadata::load(&corpus.bookkeeping_path())?;
    SearchContext::load(&IndexPaths::new(&settings.index_dir), settings.format, metadata, settings.scorer.clone())
}

pub fn build_app(settings: ServerSettings) -> Result<Router> {
    let corpus = FsCorpus::new(&settings.corpus_dir, DEFAULT_META_TOKEN_CAP);
    let context = load_context(&settings, &corpus)?;
    let app_state = AppState { context: Arc::new(RwLock::new(Arc::new(context))), corpus, settings };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc", get(doc_handler))
        .route("/index/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    let ctx = state.snapshot();
    // scoring and proximity search are CPU-bound; keep them off the async workers
    let (query, mut results) = tokio::task::spawn_blocking(move || {
        let results = ctx.retrieve_scored(&params.q);
        (params.q, results)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let total_hits = results.len();
    results.truncate(params.k.clamp(1, MAX_K));
    let elapsed = start.elapsed();
    tracing::debug!(query = %query, total_hits, took_s = elapsed.as_secs_f64(), "search");
    Ok(Json(SearchResponse { query, took_s: elapsed.as_secs_f64(), total_hits, results }))
}

pub async fn doc_handler(State(state): State<AppState>, Query(params): Query<DocParams>) -> Result<Json<DocPreview>, (StatusCode, String)> {
    let url = state
        .snapshot()
        .metadata()
        .url(&params.id)
        .map(str::to_string)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("unknown document {}", params.id)))?;
    let page = state.corpus.parse(&params.id).map_err(|e| {
        let status = if e.is_document_local() { StatusCode::UNPROCESSABLE_ENTITY } else { StatusCode::INTERNAL_SERVER_ERROR };
        (status, e.to_string())
    })?;
    let summary = match page.description {
        Some(desc) if !desc.trim().is_empty() => desc.trim().to_string(),
        _ => format!("{}...", page.text.chars().take(PREVIEW_CHARS).collect::<String>()),
    };
    Ok(Json(DocPreview { doc_id: params.id, url, title: page.title, summary }))
}

async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let settings = state.settings.clone();
    let corpus = state.corpus.clone();
    let loaded = tokio::task::spawn_blocking(move || load_context(&settings, &corpus))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let context = loaded.map_err(|e| {
        let status = match &e {
            EngineError::IndexUnavailable(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, e.to_string())
    })?;
    let num_terms = context.index().num_terms();
    let num_docs = context.index().num_docs;
    *state.context.write() = Arc::new(context);
    tracing::info!(num_terms, num_docs, "index reloaded");
    Ok(Json(serde_json::json!({ "num_terms": num_terms, "num_docs": num_docs })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.settings.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
