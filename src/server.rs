//! HTTP API.
//!
//! Accepts uploads, runs them through the processing pipeline, and serves the
//! stored history, results and source records as JSON.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/documents?filename=..&type=..` | Process a raw-body upload |
//! | `GET`  | `/history?limit=N` | Recent processing results, newest first |
//! | `GET`  | `/results/{task_id}` | One stored result |
//! | `GET`  | `/sources/{id}` | Source info, extracted values and thread id |
//! | `DELETE` | `/sources/{id}` | Delete the source-scoped keys |
//!
//! The upload type comes from `type`, else the `Content-Type` header, else
//! the `filename` extension.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "Invalid JSON format: ..." } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use doc_intake_core::models::{AgentResult, ProcessingResult};
use doc_intake_core::SharedMemory;

use crate::agent::DocumentAgent;
use crate::backend;
use crate::config::Config;
use crate::llm;
use crate::loader::{self, LoadError};
use crate::process;
use crate::sources::{self, SourceRecord};

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    memory: SharedMemory,
    agent: Arc<DocumentAgent>,
    history_limit: usize,
}

impl AppState {
    pub fn new(memory: SharedMemory, agent: Arc<DocumentAgent>, history_limit: usize) -> Self {
        Self {
            memory,
            agent,
            history_limit,
        }
    }
}

/// Build the router over an already-constructed state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/documents", post(handle_upload))
        .route("/history", get(handle_history))
        .route("/results/{task_id}", get(handle_result))
        .route(
            "/sources/{id}",
            get(handle_get_source).delete(handle_delete_source),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

/// `intake serve`: bind `[server].bind` and serve until terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let agent = DocumentAgent::new(llm::create_provider(&config.llm)?);
    let memory = backend::open_shared_memory(config).await?;
    let state = AppState::new(memory, Arc::new(agent), config.history.display_limit);

    let bind_addr = config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(bind = %bind_addr, "HTTP server started");
    println!("doc-intake listening on http://{}", bind_addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    let message = format!("{:#}", err);
    tracing::error!(error = %message, "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message,
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /documents ============

#[derive(Deserialize)]
struct UploadParams {
    filename: Option<String>,
    #[serde(rename = "type")]
    file_type: Option<String>,
}

#[derive(Serialize)]
struct UploadResponse {
    task_id: String,
    source: String,
    metadata: Map<String, Value>,
    result: AgentResult,
}

async fn handle_upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>, AppError> {
    let filename = params
        .filename
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| bad_request("filename query parameter is required"))?;
    if body.is_empty() {
        return Err(bad_request("request body must not be empty"));
    }

    let file_type = match params.file_type {
        Some(t) => t.to_ascii_lowercase(),
        None => {
            let mime = headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            loader::file_type_for(mime, &filename)
        }
    };

    let outcome =
        process::process_upload(&state.memory, &state.agent, &body, &file_type, &filename)
            .await
            .map_err(|e| match e.downcast_ref::<LoadError>() {
                Some(load_err) => bad_request(load_err.to_string()),
                None => internal(e),
            })?;

    Ok(Json(UploadResponse {
        task_id: outcome.task_id,
        source: outcome.source,
        metadata: outcome.metadata,
        result: outcome.result,
    }))
}

// ============ GET /history ============

#[derive(Deserialize)]
struct HistoryParams {
    limit: Option<usize>,
}

#[derive(Serialize)]
struct HistoryResponse {
    results: Vec<ProcessingResult>,
}

async fn handle_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, AppError> {
    let limit = params.limit.unwrap_or(state.history_limit);
    let results = state
        .memory
        .get_recent_history(limit)
        .await
        .map_err(internal)?;
    Ok(Json(HistoryResponse { results }))
}

// ============ GET /results/{task_id} ============

async fn handle_result(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<ProcessingResult>, AppError> {
    state
        .memory
        .get_processing_result(&task_id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| not_found(format!("no result for task: {}", task_id)))
}

// ============ /sources/{id} ============

async fn handle_get_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SourceRecord>, AppError> {
    let record = sources::get_source(&state.memory, &id)
        .await
        .map_err(internal)?;
    if record.is_empty() {
        return Err(not_found(format!("no data stored for source: {}", id)));
    }
    Ok(Json(record))
}

async fn handle_delete_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .memory
        .delete_source_data(&id)
        .await
        .map_err(internal)?;
    Ok(StatusCode::NO_CONTENT)
}
