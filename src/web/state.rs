//! # Web API Application State
//!
//! Shared state for request handlers: the cache manager, the ML service
//! client (with its circuit breaker), and the rate limiter. All are
//! constructed once at process start and injected by shared reference so the
//! core stays testable in isolation - no ambient globals.

use std::sync::Arc;
use tracing::info;

use crate::cache::CacheManager;
use crate::client::MlServiceClient;
use crate::config::FleetConfig;
use crate::error::Result;
use crate::resilience::RateLimiter;

/// Shared application state for the web API
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<FleetConfig>,
    pub caches: Arc<CacheManager>,
    pub ml_client: Arc<MlServiceClient>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Construct all shared singletons from configuration
    pub fn from_config(config: FleetConfig) -> Result<Self> {
        config.validate()?;
        config.log_configuration();

        let caches = Arc::new(CacheManager::new(&config.caches));
        let ml_client = Arc::new(MlServiceClient::new(config.ml_service.clone())?);
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.requests_per_minute));

        info!("Application state initialized");
        Ok(Self {
            config: Arc::new(config),
            caches,
            ml_client,
            rate_limiter,
        })
    }

    /// Shut down background cache tasks
    pub async fn shutdown(&self) {
        self.caches.close().await;
        info!("Application state shut down");
    }
}
