//! # Caching Engine
//!
//! The in-process caching engine reused across the fleet-monitoring backend:
//! a generic TTL+capacity bounded cache ([`TtlCache`]), the five-domain
//! [`CacheManager`] built from it (features, predictions, fingerprints,
//! EXPLAIN plans, anomalies), and the cache-aside [`CachedFeatureExtractor`].

pub mod feature_extractor;
pub mod manager;
pub mod ttl_cache;

pub use feature_extractor::{CachedFeatureExtractor, FeatureSource};
pub use manager::{CacheDomainMetrics, CacheManager, CacheManagerMetrics};
pub use ttl_cache::{CacheMetrics, TtlCache};
