//! # Web API Middleware
//!
//! Middleware for the endpoints this crate owns. Rate limiting runs before
//! any handler; the standard tower-http layers (timeout, CORS, tracing) are
//! applied by the embedding application.

pub mod rate_limit;

use axum::Router;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Apply the production middleware stack to a finished router
pub fn apply_middleware_stack(router: Router) -> Router {
    router
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(create_cors_layer())
        .layer(TraceLayer::new_for_http())
}

fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}
