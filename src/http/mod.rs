//! HTTP surface: REST endpoints plus the `/mcp` tool protocol endpoint,
//! all built on one axum `Router` over [`AppState`].

mod handlers;
mod middleware;
mod openapi;

use crate::error::KotaError;
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Uniform error body: `{ "error": { "code", "message" } }`.
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error_body(self.status, self.code, &self.message)
    }
}

fn error_body(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": { "code": code, "message": message } })),
    )
        .into_response()
}

fn api_error(e: KotaError) -> ApiError {
    let status = StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    ApiError {
        status,
        code: e.code(),
        message: e.to_string(),
    }
}

/// Build the full router: `/health` is unauthenticated, every other route
/// runs through [`middleware::auth_rate_limit`] first.
pub fn build_router(state: AppState) -> Router {
    handlers::mark_start();

    let authenticated = Router::new()
        .route("/search", get(handlers::search))
        .route("/files/recent", get(handlers::files_recent))
        .route("/index", post(handlers::index_repository))
        .route("/jobs/:id", get(handlers::job_status))
        .route("/validate-output", post(handlers::validate_output))
        .route("/mcp", post(handlers::mcp_endpoint))
        .route("/openapi.json", get(handlers::openapi_json))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_rate_limit,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(authenticated)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
