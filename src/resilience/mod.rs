//! # Resilience Module
//!
//! Concurrency-control primitives shared across the fleet-monitoring backend:
//! the circuit breaker guarding calls to the external ML service and the
//! per-client token-bucket rate limiter applied at the API boundary. Both are
//! process-wide singletons constructed once at startup and injected into
//! request handlers; a multi-instance deployment carries independent state per
//! instance.
//!
//! ## Usage
//!
//! ```rust
//! use pgfleet_core::resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
//!
//! let breaker = CircuitBreaker::new("ml-service".to_string(), CircuitBreakerConfig::default());
//! assert!(breaker.calls_allowed());
//! breaker.record_success();
//! assert_eq!(breaker.state(), CircuitState::Closed);
//! ```

pub mod circuit_breaker;
pub mod rate_limiter;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState,
};
pub use rate_limiter::RateLimiter;
