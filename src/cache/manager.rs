//! # Cache Manager
//!
//! Single construction point for the five independently-tuned cache instances
//! used across the backend. Each cache carries its own TTL; none shares keys or
//! capacity with another. Keys are opaque strings built by the caller
//! (`"features:<id>"` convention).

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::info;

use crate::cache::ttl_cache::{CacheMetrics, TtlCache};
use crate::client::types::{PredictionResponse, QueryFeatures};
use crate::config::CacheConfig;

/// Metrics for one named cache instance
#[derive(Debug, Clone, Serialize)]
pub struct CacheDomainMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
    pub hit_rate: f64,
}

impl CacheDomainMetrics {
    fn from_cache<K, V>(cache: &TtlCache<K, V>) -> Self
    where
        K: Eq + std::hash::Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let metrics: CacheMetrics = cache.metrics();
        Self {
            hits: metrics.hits,
            misses: metrics.misses,
            evictions: metrics.evictions,
            size: cache.len(),
            hit_rate: metrics.hit_rate(),
        }
    }
}

/// Aggregated metrics across all five caches
#[derive(Debug, Clone, Serialize)]
pub struct CacheManagerMetrics {
    pub caches: HashMap<String, CacheDomainMetrics>,
    pub overall_hit_rate: f64,
}

/// Owner of the five cache instances, constructed once at process start
pub struct CacheManager {
    features: TtlCache<String, QueryFeatures>,
    predictions: TtlCache<String, PredictionResponse>,
    fingerprints: TtlCache<String, String>,
    plans: TtlCache<String, Value>,
    anomalies: TtlCache<String, Value>,
}

impl CacheManager {
    /// Build all five caches from the configured TTLs and shared capacity
    pub fn new(config: &CacheConfig) -> Self {
        let max = config.max_entries;
        info!(
            max_entries = max,
            "Initializing cache manager with five cache domains"
        );
        Self {
            features: TtlCache::new("features", config.feature_ttl(), max),
            predictions: TtlCache::new("predictions", config.prediction_ttl(), max),
            fingerprints: TtlCache::new("fingerprints", config.fingerprint_ttl(), max),
            plans: TtlCache::new("plans", config.plan_ttl(), max),
            anomalies: TtlCache::new("anomalies", config.anomaly_ttl(), max),
        }
    }

    // Query features

    pub fn get_features(&self, key: &str) -> Option<QueryFeatures> {
        self.features.get(&key.to_string())
    }

    pub fn set_features(&self, key: String, features: QueryFeatures) {
        self.features.set(key, features);
    }

    pub fn delete_features(&self, key: &str) {
        self.features.delete(&key.to_string());
    }

    pub fn clear_features(&self) {
        self.features.clear();
    }

    // Predictions

    pub fn get_prediction(&self, key: &str) -> Option<PredictionResponse> {
        self.predictions.get(&key.to_string())
    }

    pub fn set_prediction(&self, key: String, prediction: PredictionResponse) {
        self.predictions.set(key, prediction);
    }

    pub fn clear_predictions(&self) {
        self.predictions.clear();
    }

    // Query fingerprints

    pub fn get_fingerprint(&self, key: &str) -> Option<String> {
        self.fingerprints.get(&key.to_string())
    }

    pub fn set_fingerprint(&self, key: String, fingerprint: String) {
        self.fingerprints.set(key, fingerprint);
    }

    pub fn clear_fingerprints(&self) {
        self.fingerprints.clear();
    }

    // EXPLAIN plans

    pub fn get_plan(&self, key: &str) -> Option<Value> {
        self.plans.get(&key.to_string())
    }

    pub fn set_plan(&self, key: String, plan: Value) {
        self.plans.set(key, plan);
    }

    pub fn clear_plans(&self) {
        self.plans.clear();
    }

    // Anomalies

    pub fn get_anomaly(&self, key: &str) -> Option<Value> {
        self.anomalies.get(&key.to_string())
    }

    pub fn set_anomaly(&self, key: String, anomaly: Value) {
        self.anomalies.set(key, anomaly);
    }

    pub fn clear_anomalies(&self) {
        self.anomalies.clear();
    }

    /// Aggregate per-cache and overall hit-rate figures
    pub fn metrics(&self) -> CacheManagerMetrics {
        let domains = [
            ("features", CacheDomainMetrics::from_cache(&self.features)),
            ("predictions", CacheDomainMetrics::from_cache(&self.predictions)),
            ("fingerprints", CacheDomainMetrics::from_cache(&self.fingerprints)),
            ("plans", CacheDomainMetrics::from_cache(&self.plans)),
            ("anomalies", CacheDomainMetrics::from_cache(&self.anomalies)),
        ];

        let (mut hits, mut lookups) = (0u64, 0u64);
        let mut caches = HashMap::new();
        for (name, metrics) in domains {
            hits += metrics.hits;
            lookups += metrics.hits + metrics.misses;
            caches.insert(name.to_string(), metrics);
        }

        CacheManagerMetrics {
            caches,
            overall_hit_rate: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64
            },
        }
    }

    /// Clear all five caches
    pub fn clear_all(&self) {
        self.features.clear();
        self.predictions.clear();
        self.fingerprints.clear();
        self.plans.clear();
        self.anomalies.clear();
    }

    /// Close all five caches, stopping their sweep tasks
    pub async fn close(&self) {
        self.features.close().await;
        self.predictions.close().await;
        self.fingerprints.close().await;
        self.plans.close().await;
        self.anomalies.close().await;
        info!("Cache manager closed");
    }
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager").finish_non_exhaustive()
    }
}
