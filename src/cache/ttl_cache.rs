//! # Generic TTL Cache
//!
//! Thread-safe key/value store with a flat per-instance TTL and a bounded entry
//! count. Expired entries are dropped lazily on read and by a background sweep
//! task that wakes every `ttl / 2`. When at capacity, `set` evicts the entry
//! soonest to expire before inserting - a cheap O(n) approximation of recency,
//! deliberately not true LRU.

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Hit/miss/eviction counters for one cache instance
///
/// Counters are read lock-free; a snapshot is eventually consistent with
/// respect to in-flight operations, never blocking readers or writers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheMetrics {
    /// Fraction of lookups served from cache; 0.0 when no lookups were made
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

struct CacheShared<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    ttl: Duration,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    closed: AtomicBool,
}

/// Generic thread-safe cache with per-entry expiration and bounded size
///
/// One background sweep task runs for the cache's lifetime when constructed
/// inside a tokio runtime; [`TtlCache::close`] stops and joins it. `close` is
/// idempotent: a second call is a logged no-op, and `set` after close is
/// rejected with a warning.
pub struct TtlCache<K, V> {
    name: String,
    shared: Arc<CacheShared<K, V>>,
    shutdown_tx: watch::Sender<bool>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache with the given TTL and capacity, starting its sweep task
    ///
    /// Outside a tokio runtime the sweep is disabled and only lazy read-time
    /// expiry applies.
    pub fn new(name: impl Into<String>, ttl: Duration, max_entries: usize) -> Self {
        let name = name.into();
        let shared = Arc::new(CacheShared {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sweeper = match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let task = handle.spawn(Self::sweep_loop(
                    name.clone(),
                    Arc::clone(&shared),
                    shutdown_rx,
                ));
                Some(task)
            }
            Err(_) => {
                debug!(cache = %name, "No tokio runtime - background sweep disabled");
                None
            }
        };

        debug!(
            cache = %name,
            ttl_ms = ttl.as_millis() as u64,
            max_entries,
            "Cache initialized"
        );

        Self {
            name,
            shared,
            shutdown_tx,
            sweeper: Mutex::new(sweeper),
        }
    }

    /// Look up a key, treating expired-but-unswept entries as misses
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        {
            let entries = self.shared.entries.read();
            if let Some(entry) = entries.get(key) {
                if now < entry.expires_at {
                    self.shared.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.value.clone());
                }
            } else {
                self.shared.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        }

        // Entry exists but has expired: drop it eagerly rather than waiting
        // for the sweep. Re-check under the write lock since another caller
        // may have replaced it in the meantime.
        let mut entries = self.shared.entries.write();
        if let Some(entry) = entries.get(key) {
            if now >= entry.expires_at {
                entries.remove(key);
            }
        }
        self.shared.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Insert or replace a value, evicting the soonest-to-expire entry first
    /// when a new key would exceed capacity
    pub fn set(&self, key: K, value: V) {
        if self.shared.closed.load(Ordering::Acquire) {
            warn!(cache = %self.name, "Set on closed cache ignored");
            return;
        }

        let expires_at = Instant::now() + self.shared.ttl;
        let mut entries = self.shared.entries.write();

        if entries.len() >= self.shared.max_entries && !entries.contains_key(&key) {
            let victim = entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(k, _)| k.clone());
            if let Some(victim) = victim {
                entries.remove(&victim);
                self.shared.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }

        entries.insert(key, CacheEntry { value, expires_at });
    }

    /// Remove a single entry
    pub fn delete(&self, key: &K) {
        self.shared.entries.write().remove(key);
    }

    /// Remove all entries
    pub fn clear(&self) {
        self.shared.entries.write().clear();
    }

    /// Number of entries, including expired-but-unswept ones
    pub fn len(&self) -> usize {
        self.shared.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lock-free snapshot of hit/miss/eviction counters
    pub fn metrics(&self) -> CacheMetrics {
        CacheMetrics {
            hits: self.shared.hits.load(Ordering::Relaxed),
            misses: self.shared.misses.load(Ordering::Relaxed),
            evictions: self.shared.evictions.load(Ordering::Relaxed),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop the sweep task, wait for it to exit, and clear all entries
    ///
    /// Safe to call exactly once; subsequent calls are logged no-ops.
    pub async fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            warn!(cache = %self.name, "Cache already closed");
            return;
        }

        let _ = self.shutdown_tx.send(true);
        let sweeper = self.sweeper.lock().take();
        if let Some(task) = sweeper {
            let _ = task.await;
        }

        self.shared.entries.write().clear();
        debug!(cache = %self.name, "Cache closed");
    }

    async fn sweep_loop(
        name: String,
        shared: Arc<CacheShared<K, V>>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        // ttl/2 keeps worst-case staleness of unread keys below 1.5x ttl
        let period = (shared.ttl / 2).max(Duration::from_millis(10));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = Instant::now();
                    let removed = {
                        let mut entries = shared.entries.write();
                        let before = entries.len();
                        entries.retain(|_, entry| entry.expires_at > now);
                        before - entries.len()
                    };
                    if removed > 0 {
                        debug!(cache = %name, removed, "Swept expired cache entries");
                    }
                }
                _ = shutdown_rx.changed() => {
                    debug!(cache = %name, "Cache sweep task shutting down");
                    return;
                }
            }
        }
    }
}

impl<K, V> std::fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("name", &self.name)
            .field("ttl", &self.shared.ttl)
            .field("max_entries", &self.shared.max_entries)
            .finish_non_exhaustive()
    }
}
