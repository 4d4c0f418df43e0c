//! REST handlers, thin wrappers over the query engine, the indexer, and
//! the memory layer: the same functions the MCP tool surface dispatches to.

use crate::error::KotaError;
use crate::indexer::IndexJobRequest;
use crate::query;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Instant;

use super::{api_error, ApiError};

static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

pub fn mark_start() {
    SERVER_START.get_or_init(Instant::now);
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_seconds: u64,
}

pub async fn health() -> Json<HealthResponse> {
    let uptime = SERVER_START
        .get_or_init(Instant::now)
        .elapsed()
        .as_secs();
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: uptime,
    })
}

#[derive(Deserialize)]
pub struct SearchQuery {
    term: String,
    repository: String,
    limit: Option<u32>,
}

pub async fn search(
    State(state): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Value>, ApiError> {
    let hits = query::search_code(&state.store, &q.repository, &q.term, q.limit).map_err(api_error)?;
    Ok(Json(json!({ "hits": hits })))
}

#[derive(Deserialize)]
pub struct RecentQuery {
    repository: String,
    limit: Option<u32>,
}

pub async fn files_recent(
    State(state): State<AppState>,
    Query(q): Query<RecentQuery>,
) -> Result<Json<Value>, ApiError> {
    let files = query::list_recent_files(&state.store, &q.repository, q.limit).map_err(api_error)?;
    Ok(Json(json!({ "files": files })))
}

#[derive(Deserialize)]
pub struct IndexRequest {
    full_name: String,
    #[serde(default = "default_ref")]
    git_ref: String,
    local_path: Option<String>,
}

fn default_ref() -> String {
    "main".to_string()
}

pub async fn index_repository(
    State(state): State<AppState>,
    Json(body): Json<IndexRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let job = state
        .indexer
        .enqueue(IndexJobRequest {
            full_name: body.full_name,
            git_ref: body.git_ref,
            local_path: body.local_path.map(std::path::PathBuf::from),
        })
        .map_err(api_error)?;
    Ok((StatusCode::ACCEPTED, Json(serde_json::to_value(job).unwrap_or(Value::Null))))
}

pub async fn job_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let job = state.indexer.get_job(&id).map_err(api_error)?;
    match job {
        Some(job) => Ok(Json(serde_json::to_value(job).unwrap_or(Value::Null))),
        None => Err(api_error(KotaError::NotFound(format!("job {id}")))),
    }
}

#[derive(Deserialize)]
pub struct ValidateOutputRequest {
    schema: Value,
    output: Value,
}

#[derive(Serialize)]
struct ValidationErrorEntry {
    path: String,
    message: String,
}

#[derive(Serialize)]
struct ValidateOutputResponse {
    valid: bool,
    errors: Vec<ValidationErrorEntry>,
}

pub async fn validate_output(Json(req): Json<ValidateOutputRequest>) -> Result<Json<ValidateOutputResponse>, ApiError> {
    let validator = jsonschema::validator_for(&req.schema).map_err(|e| {
        api_error(KotaError::InvalidArgument(format!("invalid schema: {e}")))
    })?;
    let errors: Vec<ValidationErrorEntry> = validator
        .iter_errors(&req.output)
        .map(|e| ValidationErrorEntry {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();
    Ok(Json(ValidateOutputResponse {
        valid: errors.is_empty(),
        errors,
    }))
}

pub async fn mcp_endpoint(
    State(state): State<AppState>,
    body: String,
) -> impl IntoResponse {
    let handler = crate::mcp::MCPServer::new(state).into_io_handler();
    match handler.handle_request(&body).await {
        Some(response) => (StatusCode::OK, response),
        None => (StatusCode::OK, String::new()),
    }
}

pub async fn openapi_json() -> Json<Value> {
    Json(super::openapi::document())
}
