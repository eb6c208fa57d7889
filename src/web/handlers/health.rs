//! # Health Check Handlers
//!
//! Liveness and readiness endpoints for monitoring and load balancing, plus
//! the cache-metrics endpoint the dashboard reads.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::debug;

use crate::cache::CacheManagerMetrics;
use crate::resilience::{CircuitBreakerMetrics, CircuitState};
use crate::web::state::AppState;

/// Basic health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
}

/// Detailed health check response
#[derive(Serialize)]
pub struct DetailedHealthResponse {
    status: String,
    timestamp: String,
    ml_service_healthy: bool,
    circuit_breaker: CircuitBreakerMetrics,
    caches: CacheManagerMetrics,
}

/// Basic health check endpoint: GET /health
///
/// Returns OK whenever the process is serving requests; never consults
/// downstream dependencies.
pub async fn basic_health(_state: State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Detailed health endpoint: GET /health/detailed
///
/// Probes the ML service through the resilient client (which records the
/// outcome on the breaker) and reports breaker and cache metrics. Answers
/// 200 with `status: "degraded"` rather than 503 when the ML service is
/// down: the monitoring backend itself remains usable without predictions.
pub async fn detailed_health(
    State(state): State<AppState>,
) -> (StatusCode, Json<DetailedHealthResponse>) {
    let ml_healthy = state.ml_client.is_healthy().await;
    let breaker = state.ml_client.circuit_breaker_metrics();

    let status = if ml_healthy && breaker.state == CircuitState::Closed {
        "ok"
    } else {
        "degraded"
    };
    debug!(status, ml_healthy, breaker_state = %breaker.state, "Detailed health check");

    (
        StatusCode::OK,
        Json(DetailedHealthResponse {
            status: status.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            ml_service_healthy: ml_healthy,
            circuit_breaker: breaker,
            caches: state.caches.metrics(),
        }),
    )
}

/// Cache metrics endpoint: GET /metrics/caches
pub async fn cache_metrics(State(state): State<AppState>) -> Json<CacheManagerMetrics> {
    Json(state.caches.metrics())
}
