#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, TimescaleDB in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # PgFleet Core
//!
//! In-process resilience and caching runtime for the PostgreSQL fleet-monitoring
//! backend. Collectors push metrics, the dashboard API serves queries, and an
//! external ML service supplies performance predictions; this crate is the layer
//! between the API handlers and that ML service.
//!
//! ## Architecture
//!
//! - [`cache`] - Generic TTL+capacity bounded cache, the five-domain cache
//!   manager, and the cache-aside feature extractor
//! - [`resilience`] - Circuit breaker guarding the ML service and the
//!   per-client token-bucket rate limiter
//! - [`client`] - Retrying JSON-over-HTTP client for the ML service, composing
//!   the circuit breaker with exponential backoff
//! - [`config`] - Environment-aware configuration with per-environment profiles
//! - [`web`] - Application state, rate-limit middleware, and health handlers
//! - [`error`] - Structured error handling
//!
//! All shared state (caches, breaker, rate limiter) is constructed once at
//! process start, owned by [`web::state::AppState`], and injected into request
//! handlers by shared reference. A multi-instance deployment has independent
//! breakers, caches, and rate limits per instance.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pgfleet_core::cache::CacheManager;
//! use pgfleet_core::client::MlServiceClient;
//! use pgfleet_core::config::FleetConfig;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = FleetConfig::from_environment();
//! let caches = Arc::new(CacheManager::new(&config.caches));
//! let ml_client = Arc::new(MlServiceClient::new(config.ml_service.clone())?);
//!
//! if ml_client.is_healthy().await {
//!     println!("ML service reachable, breaker {}", ml_client.circuit_breaker_state());
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod resilience;
pub mod web;

pub use cache::{CacheManager, CacheMetrics, CachedFeatureExtractor, TtlCache};
pub use client::{MlClientError, MlServiceClient};
pub use config::FleetConfig;
pub use error::{FleetError, Result};
pub use resilience::{CircuitBreaker, CircuitState, RateLimiter};
