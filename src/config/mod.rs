//! # Configuration Management
//!
//! Environment-aware configuration for the caching and resilience core. Allows
//! different cache behaviors in production, development, and test environments,
//! with `PGFLEET_*` environment variable overrides on top of the selected
//! profile.
//!
//! Circuit breaker thresholds are deliberately not configured here: they are
//! fixed constants on [`crate::resilience::CircuitBreakerConfig`].

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{FleetError, Result};

/// Top-level configuration for the fleet-monitoring core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    pub caches: CacheConfig,
    pub ml_service: MlServiceConfig,
    pub rate_limit: RateLimitConfig,
}

/// Configuration for the five cache domains
///
/// Each domain carries its own TTL; `max_entries` is shared by all instances
/// (each cache is independently bounded to this size, capacity is not pooled).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub feature_ttl_seconds: u64,
    pub prediction_ttl_seconds: u64,
    pub fingerprint_ttl_seconds: u64,
    pub plan_ttl_seconds: u64,
    pub anomaly_ttl_seconds: u64,
}

impl CacheConfig {
    pub fn feature_ttl(&self) -> Duration {
        Duration::from_secs(self.feature_ttl_seconds)
    }

    pub fn prediction_ttl(&self) -> Duration {
        Duration::from_secs(self.prediction_ttl_seconds)
    }

    pub fn fingerprint_ttl(&self) -> Duration {
        Duration::from_secs(self.fingerprint_ttl_seconds)
    }

    pub fn plan_ttl(&self) -> Duration {
        Duration::from_secs(self.plan_ttl_seconds)
    }

    pub fn anomaly_ttl(&self) -> Duration {
        Duration::from_secs(self.anomaly_ttl_seconds)
    }
}

/// ML service endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlServiceConfig {
    /// Base URL for the ML service (e.g., "<http://localhost:8000>")
    pub base_url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Maximum retry attempts beyond the first request
    pub max_retries: u32,
    /// First backoff delay in milliseconds; doubles on each retry
    pub initial_backoff_ms: u64,
    /// Connection pool policy, applied once at client construction
    pub pool: HttpPoolConfig,
}

/// HTTP connection pool limits for the ML client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpPoolConfig {
    pub max_idle_per_host: usize,
    pub idle_timeout_seconds: u64,
}

impl MlServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }
}

/// Rate limiting configuration for the API boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Token bucket capacity; refill rate is `requests_per_minute / 60` per second
    pub requests_per_minute: u32,
}

impl Default for FleetConfig {
    /// Default configuration suitable for production
    fn default() -> Self {
        Self {
            caches: CacheConfig {
                max_entries: 1000,
                feature_ttl_seconds: 300,
                prediction_ttl_seconds: 60,
                fingerprint_ttl_seconds: 3600,
                plan_ttl_seconds: 600,
                anomaly_ttl_seconds: 120,
            },
            ml_service: MlServiceConfig {
                base_url: "http://localhost:8000".to_string(),
                timeout_ms: 30000,
                max_retries: 3,
                initial_backoff_ms: 100,
                pool: HttpPoolConfig {
                    max_idle_per_host: 10,
                    idle_timeout_seconds: 90,
                },
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                requests_per_minute: 300,
            },
        }
    }
}

impl FleetConfig {
    /// Create test-optimized configuration with rapid cache invalidation
    pub fn for_test() -> Self {
        Self {
            caches: CacheConfig {
                max_entries: 100,
                feature_ttl_seconds: 1,
                prediction_ttl_seconds: 1,
                fingerprint_ttl_seconds: 5,
                plan_ttl_seconds: 5,
                anomaly_ttl_seconds: 1,
            },
            ml_service: MlServiceConfig {
                base_url: "http://localhost:8000".to_string(),
                timeout_ms: 2000,
                max_retries: 3,
                initial_backoff_ms: 10,
                pool: HttpPoolConfig {
                    max_idle_per_host: 2,
                    idle_timeout_seconds: 5,
                },
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                requests_per_minute: 60,
            },
        }
    }

    /// Create development-optimized configuration
    pub fn for_development() -> Self {
        Self {
            caches: CacheConfig {
                max_entries: 500,
                feature_ttl_seconds: 60,
                prediction_ttl_seconds: 10,
                fingerprint_ttl_seconds: 600,
                plan_ttl_seconds: 120,
                anomaly_ttl_seconds: 30,
            },
            ..Self::default()
        }
    }

    /// Load configuration from environment or use defaults
    pub fn from_environment() -> Self {
        let environment = env::var("PGFLEET_ENV")
            .or_else(|_| env::var("RUST_ENV"))
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "production".to_string());

        let config = match environment.as_str() {
            "test" => {
                info!("Loading test configuration (rapid cache invalidation)");
                Self::for_test()
            }
            "development" => {
                info!("Loading development configuration");
                Self::for_development()
            }
            _ => {
                info!("Loading production configuration");
                Self::default()
            }
        };

        config.with_env_overrides()
    }

    /// Apply environment variable overrides to configuration
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(max) = env::var("PGFLEET_CACHE_MAX_ENTRIES") {
            if let Ok(entries) = max.parse::<usize>() {
                self.caches.max_entries = entries;
                info!("Cache max entries override: {}", entries);
            }
        }

        if let Ok(ttl) = env::var("PGFLEET_CACHE_FEATURE_TTL_SECONDS") {
            if let Ok(seconds) = ttl.parse::<u64>() {
                self.caches.feature_ttl_seconds = seconds;
                info!("Feature cache TTL override: {}s", seconds);
            }
        }

        if let Ok(ttl) = env::var("PGFLEET_CACHE_PREDICTION_TTL_SECONDS") {
            if let Ok(seconds) = ttl.parse::<u64>() {
                self.caches.prediction_ttl_seconds = seconds;
                info!("Prediction cache TTL override: {}s", seconds);
            }
        }

        if let Ok(url) = env::var("PGFLEET_ML_SERVICE_URL") {
            info!("ML service URL override: {}", url);
            self.ml_service.base_url = url;
        }

        if let Ok(timeout) = env::var("PGFLEET_ML_TIMEOUT_MS") {
            if let Ok(timeout_ms) = timeout.parse::<u64>() {
                self.ml_service.timeout_ms = timeout_ms;
                info!("ML service timeout override: {}ms", timeout_ms);
            }
        }

        if let Ok(enabled) = env::var("PGFLEET_RATE_LIMIT_ENABLED") {
            self.rate_limit.enabled = enabled.parse().unwrap_or(self.rate_limit.enabled);
            info!("Rate limiting enabled override: {}", self.rate_limit.enabled);
        }

        if let Ok(rpm) = env::var("PGFLEET_RATE_LIMIT_PER_MINUTE") {
            if let Ok(requests) = rpm.parse::<u32>() {
                self.rate_limit.requests_per_minute = requests;
                info!("Rate limit override: {} requests/minute", requests);
            }
        }

        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.caches.max_entries == 0 {
            return Err(FleetError::config_error(
                "Cache max entries must be greater than 0",
            ));
        }

        if self.ml_service.base_url.is_empty() {
            return Err(FleetError::config_error("ML service base URL is required"));
        }

        if self.ml_service.timeout_ms == 0 {
            return Err(FleetError::config_error(
                "ML service timeout must be greater than 0",
            ));
        }

        if self.rate_limit.enabled && self.rate_limit.requests_per_minute == 0 {
            return Err(FleetError::config_error(
                "Rate limit must allow at least 1 request/minute when enabled",
            ));
        }

        if self.caches.prediction_ttl_seconds == 0 {
            warn!("Prediction cache TTL is 0 - caching effectively disabled");
        }

        Ok(())
    }

    /// Log current configuration for debugging
    pub fn log_configuration(&self) {
        info!("PgFleet Core Configuration:");
        info!("  Cache max entries (per domain): {}", self.caches.max_entries);
        info!(
            "  Cache TTLs: features {}s, predictions {}s, fingerprints {}s, plans {}s, anomalies {}s",
            self.caches.feature_ttl_seconds,
            self.caches.prediction_ttl_seconds,
            self.caches.fingerprint_ttl_seconds,
            self.caches.plan_ttl_seconds,
            self.caches.anomaly_ttl_seconds
        );
        info!(
            "  ML service: {} ({}ms timeout, {} retries)",
            self.ml_service.base_url, self.ml_service.timeout_ms, self.ml_service.max_retries
        );
        info!(
            "  Rate limiting: enabled={}, {} requests/minute",
            self.rate_limit.enabled, self.rate_limit.requests_per_minute
        );
    }
}
