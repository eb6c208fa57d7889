//! # Per-Client Rate Limiter
//!
//! Token bucket per client identifier: a bucket holds `capacity` tokens and
//! refills at `capacity / 60` tokens per second, so the budget reads as
//! "capacity requests per minute" spread evenly. Buckets are created lazily at
//! full capacity on first sight of a client.
//!
//! Buckets for inactive clients are never evicted; [`RateLimiter::reset`] is
//! the only reclamation path, so high client-identifier cardinality (e.g.
//! IP-keyed buckets) grows the map without bound.

use dashmap::DashMap;
use std::time::Instant;
use tracing::debug;

const REFILL_WINDOW_SECONDS: f64 = 60.0;

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token-bucket rate limiter keyed by opaque client identifier
///
/// The bucket map is sharded; per-bucket math runs under the entry's shard
/// lock, so each client's checks are fully serialized.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<String, TokenBucket>,
    capacity: f64,
    refill_rate: f64,
}

impl RateLimiter {
    /// Create a rate limiter allowing `requests_per_minute` per client
    pub fn new(requests_per_minute: u32) -> Self {
        let capacity = f64::from(requests_per_minute);
        Self {
            buckets: DashMap::new(),
            capacity,
            refill_rate: capacity / REFILL_WINDOW_SECONDS,
        }
    }

    /// Check whether a request from this client may proceed, consuming one
    /// token when it does
    pub fn allow(&self, client_id: &str) -> bool {
        let now = Instant::now();
        let mut bucket = self
            .buckets
            .entry(client_id.to_string())
            .or_insert_with(|| TokenBucket {
                tokens: self.capacity,
                last_refill: now,
            });

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_rate).min(self.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            debug!(client_id = %client_id, "Rate limit exceeded");
            false
        }
    }

    #[cfg(test)]
    fn with_refill_rate(capacity: u32, refill_rate: f64) -> Self {
        Self {
            buckets: DashMap::new(),
            capacity: f64::from(capacity),
            refill_rate,
        }
    }

    /// Clear all buckets (test/operational utility)
    pub fn reset(&self) {
        self.buckets.clear();
    }

    /// Number of client buckets currently tracked
    pub fn client_count(&self) -> usize {
        self.buckets.len()
    }
}
