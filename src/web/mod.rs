//! # Web API Boundary
//!
//! The thin HTTP surface this crate owns: shared application state, the
//! rate-limit middleware, and health/metrics handlers. The full dashboard
//! route tree, authentication, and SQL access live outside this crate and
//! consume [`state::AppState`] by shared reference.

pub mod handlers;
pub mod middleware;
pub mod state;

pub use state::AppState;

use axum::routing::get;
use axum::Router;

/// Build the router for the endpoints this crate owns
pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(handlers::health::basic_health))
        .route("/health/detailed", get(handlers::health::detailed_health))
        .route("/metrics/caches", get(handlers::health::cache_metrics))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::enforce_rate_limit,
        ))
        .with_state(state);

    middleware::apply_middleware_stack(router)
}
