//! # Rate-Limit Middleware
//!
//! Consults the token-bucket rate limiter before any handler runs. The client
//! identifier is the `x-api-key` header when present, otherwise the peer
//! address; requests over budget answer 429 without reaching a handler.

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::net::SocketAddr;
use tracing::warn;

use crate::web::state::AppState;

const API_KEY_HEADER: &str = "x-api-key";

/// Deny requests whose client has exhausted its token bucket
pub async fn enforce_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.rate_limit.enabled {
        return next.run(request).await;
    }

    let client_id = client_identifier(&request);
    if state.rate_limiter.allow(&client_id) {
        return next.run(request).await;
    }

    warn!(client_id = %client_id, path = %request.uri().path(), "Request rate limited");
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({
            "error": "rate_limit_exceeded",
            "message": "Request rate limit exceeded, try again later",
        })),
    )
        .into_response()
}

fn client_identifier(request: &Request) -> String {
    if let Some(key) = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        return format!("key:{key}");
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| format!("ip:{}", addr.ip()))
        .unwrap_or_else(|| "unknown".to_string())
}
