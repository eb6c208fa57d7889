//! # Cached Feature Extractor
//!
//! Cache-aside wrapper over a raw feature-extraction collaborator. Lookups
//! check the feature cache first; misses delegate to the wrapped source and
//! populate the cache on the way out. Batch extraction partitions into
//! cached/uncached subsets and extracts the misses individually - the
//! underlying source has no batch call.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::manager::CacheManager;
use crate::client::types::QueryFeatures;
use crate::error::Result;

/// Raw feature-extraction collaborator (reads query statistics from the
/// metric stores)
#[async_trait]
pub trait FeatureSource: Send + Sync {
    async fn extract_query_features(&self, query_id: &str) -> Result<QueryFeatures>;
}

/// Cache-aside feature extraction over any [`FeatureSource`]
pub struct CachedFeatureExtractor {
    source: Arc<dyn FeatureSource>,
    caches: Arc<CacheManager>,
}

fn feature_key(query_id: &str) -> String {
    format!("features:{query_id}")
}

impl CachedFeatureExtractor {
    pub fn new(source: Arc<dyn FeatureSource>, caches: Arc<CacheManager>) -> Self {
        Self { source, caches }
    }

    /// Extract features for one query, serving from cache when possible
    pub async fn extract_query_features(&self, query_id: &str) -> Result<QueryFeatures> {
        let key = feature_key(query_id);
        if let Some(features) = self.caches.get_features(&key) {
            debug!(query_id = %query_id, "Feature cache hit");
            return Ok(features);
        }

        let features = self.source.extract_query_features(query_id).await?;
        self.caches.set_features(key, features.clone());
        Ok(features)
    }

    /// Extract features for a batch of queries
    ///
    /// Cached entries are served from the map; the rest are extracted
    /// individually. A query whose extraction fails is logged and omitted
    /// from the result rather than failing the whole batch.
    pub async fn extract_batch_query_features(
        &self,
        query_ids: &[String],
    ) -> HashMap<String, QueryFeatures> {
        let mut results = HashMap::with_capacity(query_ids.len());
        let mut uncached = Vec::new();

        for query_id in query_ids {
            match self.caches.get_features(&feature_key(query_id)) {
                Some(features) => {
                    results.insert(query_id.clone(), features);
                }
                None => uncached.push(query_id),
            }
        }

        debug!(
            total = query_ids.len(),
            cached = results.len(),
            uncached = uncached.len(),
            "Batch feature extraction partitioned"
        );

        for query_id in uncached {
            match self.source.extract_query_features(query_id).await {
                Ok(features) => {
                    self.caches
                        .set_features(feature_key(query_id), features.clone());
                    results.insert(query_id.clone(), features);
                }
                Err(e) => {
                    warn!(
                        query_id = %query_id,
                        error = %e,
                        "Feature extraction failed, omitting query from batch"
                    );
                }
            }
        }

        results
    }

    /// Invalidate the cached features for one query
    pub fn clear_feature_cache(&self, query_id: &str) {
        self.caches.delete_features(&feature_key(query_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FleetConfig;
    use crate::error::FleetError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        failing_ids: Vec<String>,
    }

    impl CountingSource {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failing_ids: Vec::new(),
            }
        }

        fn failing_on(ids: &[&str]) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failing_ids: ids.iter().map(ToString::to_string).collect(),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FeatureSource for CountingSource {
        async fn extract_query_features(&self, query_id: &str) -> Result<QueryFeatures> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing_ids.iter().any(|id| id == query_id) {
                return Err(FleetError::feature_extraction(query_id, "no statistics"));
            }
            Ok(QueryFeatures {
                query_id: query_id.to_string(),
                avg_execution_time_ms: 1.0,
                calls_per_minute: 1.0,
                mean_rows_returned: 1.0,
                shared_blocks_hit_ratio: 1.0,
                temp_blocks_written: 0.0,
                planner_cost: 1.0,
                table_count: 1,
                join_count: 0,
            })
        }
    }

    fn extractor_with(source: Arc<CountingSource>) -> CachedFeatureExtractor {
        let caches = Arc::new(CacheManager::new(&FleetConfig::default().caches));
        CachedFeatureExtractor::new(source, caches)
    }

    #[tokio::test]
    async fn test_second_lookup_served_from_cache() {
        let source = Arc::new(CountingSource::new());
        let extractor = extractor_with(Arc::clone(&source));

        let first = extractor.extract_query_features("q1").await.unwrap();
        let second = extractor.extract_query_features("q1").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn test_invalidation_forces_reextraction() {
        let source = Arc::new(CountingSource::new());
        let extractor = extractor_with(Arc::clone(&source));

        extractor.extract_query_features("q1").await.unwrap();
        extractor.extract_query_features("q1").await.unwrap();
        assert_eq!(source.call_count(), 1);

        extractor.clear_feature_cache("q1");
        extractor.extract_query_features("q1").await.unwrap();
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn test_batch_partitions_cached_and_uncached() {
        let source = Arc::new(CountingSource::new());
        let extractor = extractor_with(Arc::clone(&source));

        extractor.extract_query_features("q1").await.unwrap();
        assert_eq!(source.call_count(), 1);

        let ids: Vec<String> = ["q1", "q2", "q3"].iter().map(ToString::to_string).collect();
        let results = extractor.extract_batch_query_features(&ids).await;

        assert_eq!(results.len(), 3);
        // q1 was cached; only q2 and q3 hit the source
        assert_eq!(source.call_count(), 3);
    }

    #[tokio::test]
    async fn test_batch_omits_failing_ids() {
        let source = Arc::new(CountingSource::failing_on(&["q2"]));
        let extractor = extractor_with(Arc::clone(&source));

        let ids: Vec<String> = ["q1", "q2", "q3"].iter().map(ToString::to_string).collect();
        let results = extractor.extract_batch_query_features(&ids).await;

        assert_eq!(results.len(), 2);
        assert!(results.contains_key("q1"));
        assert!(!results.contains_key("q2"));
        assert!(results.contains_key("q3"));
    }

    #[tokio::test]
    async fn test_batch_results_keyed_by_query_id() {
        let source = Arc::new(CountingSource::new());
        let extractor = extractor_with(Arc::clone(&source));

        let ids: Vec<String> = ["a", "b"].iter().map(ToString::to_string).collect();
        let results = extractor.extract_batch_query_features(&ids).await;

        assert_eq!(results["a"].query_id, "a");
        assert_eq!(results["b"].query_id, "b");
    }
}
