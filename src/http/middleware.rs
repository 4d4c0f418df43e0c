//! Pre-handler pipeline: DNS-rebinding origin check, then authentication,
//! then rate limiting. Every route except `/health` runs through this;
//! rate-limit headers are set before the handler runs so they land on the
//! response regardless of what the handler does.

use crate::auth::AuthContext;
use crate::error::KotaError;
use crate::rate_limit::{self, RateLimitHeaders};
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use super::error_body;

fn check_origin(state: &AppState, req: &Request) -> Result<(), Response> {
    let Some(allowed) = &state.config.dns_rebinding_allowed_origins else {
        return Ok(());
    };
    let origin = req
        .headers()
        .get(axum::http::header::ORIGIN)
        .and_then(|v| v.to_str().ok());
    match origin {
        Some(o) if allowed.iter().any(|a| a == o) => Ok(()),
        _ => {
            warn!(origin = ?origin, "rejected request: origin not in dns-rebinding allow-list");
            Err(error_body(
                StatusCode::FORBIDDEN,
                "origin_not_allowed",
                "request origin is not on the configured allow-list",
            ))
        }
    }
}

fn extract_bearer(req: &Request) -> Option<&str> {
    req.headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn apply_rate_limit_headers(headers: &mut axum::http::HeaderMap, rl: &RateLimitHeaders) {
    headers.insert(
        "X-RateLimit-Limit",
        HeaderValue::from_str(&rl.limit.to_string()).unwrap(),
    );
    headers.insert(
        "X-RateLimit-Remaining",
        HeaderValue::from_str(&rl.remaining.to_string()).unwrap(),
    );
    headers.insert(
        "X-RateLimit-Reset",
        HeaderValue::from_str(&rl.reset_at.timestamp().to_string()).unwrap(),
    );
}

pub async fn auth_rate_limit(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Err(resp) = check_origin(&state, &req) {
        return resp;
    }

    let presented = extract_bearer(&req).unwrap_or("").to_string();
    let auth = match state.authenticator.authenticate(&presented) {
        Ok(ctx) => ctx,
        Err(_) => {
            return error_body(StatusCode::UNAUTHORIZED, "auth_denied", "authentication denied")
        }
    };

    let rate_limit_result =
        rate_limit::check_and_increment(&state.store, &state.config, &auth.key_id, auth.tier);
    let rl = match rate_limit_result {
        Ok(rl) => rl,
        Err(KotaError::RateLimited { retry_after_secs }) => {
            let mut resp = error_body(
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "rate limit exceeded",
            );
            resp.headers_mut().insert(
                "Retry-After",
                HeaderValue::from_str(&retry_after_secs.to_string()).unwrap(),
            );
            return resp;
        }
        Err(_) => {
            let fail = rate_limit::fail_closed();
            let KotaError::RateLimited { retry_after_secs } = fail else {
                unreachable!("fail_closed always returns RateLimited")
            };
            let mut resp = error_body(
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "rate limit check failed",
            );
            resp.headers_mut().insert(
                "Retry-After",
                HeaderValue::from_str(&retry_after_secs.to_string()).unwrap(),
            );
            return resp;
        }
    };

    req.extensions_mut().insert::<AuthContext>(auth);
    let mut resp = next.run(req).await;
    apply_rate_limit_headers(resp.headers_mut(), &rl);
    resp
}
