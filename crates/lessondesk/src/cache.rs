//! Request-level query cache for backend list fetches.
//!
//! Entries are fresh for `stale_time`; a stale or missing entry is refetched.
//! Entries nobody has read for `gc_time` are purged by [`QueryCache::collect_garbage`].
//! Concurrent fetches of the same key share one request. A fetch that was
//! invalidated while it ran returns its result without caching it.

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::api::ApiError;

/// A cached response with timing metadata.
#[derive(Clone)]
struct CachedQuery {
    value: Value,
    fetched_at: Instant,
    last_read: Instant,
}

/// Thread-safe cache keyed by request path.
///
/// Uses DashMap for concurrent access without external locking.
pub struct QueryCache {
    entries: DashMap<String, CachedQuery>,
    /// Per-key locks so identical concurrent fetches are coalesced
    fetch_locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
    /// Bumped by every invalidation of the key
    generations: DashMap<String, u64>,
    stale_time: Duration,
    gc_time: Duration,
}

impl QueryCache {
    pub fn new(stale_time: Duration, gc_time: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            fetch_locks: DashMap::new(),
            generations: DashMap::new(),
            stale_time,
            gc_time,
        }
    }

    /// Five minutes stale, ten minutes until collection.
    pub fn with_default_timings() -> Self {
        Self::new(Duration::from_secs(5 * 60), Duration::from_secs(10 * 60))
    }

    /// Gets a cached value if it is still fresh.
    pub fn get_fresh(&self, key: &str) -> Option<Value> {
        let mut entry = self.entries.get_mut(key)?;
        entry.last_read = Instant::now();
        (entry.fetched_at.elapsed() < self.stale_time).then(|| entry.value.clone())
    }

    pub fn insert(&self, key: &str, value: Value) {
        let now = Instant::now();
        self.entries.insert(
            key.to_string(),
            CachedQuery {
                value,
                fetched_at: now,
                last_read: now,
            },
        );
    }

    /// Returns the fresh cached value for `key`, or runs `fetcher` and caches
    /// its result.
    ///
    /// Retryable failures get one immediate second attempt. Callers that
    /// arrive while a fetch for the same key is running wait for it and read
    /// its result from the cache.
    pub async fn fetch<F, Fut>(&self, key: &str, fetcher: F) -> Result<Value, ApiError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Value, ApiError>>,
    {
        if let Some(cached) = self.get_fresh(key) {
            debug!(key, "Query cache hit");
            return Ok(cached);
        }

        let lock = self.fetch_lock(key);
        let _guard = lock.lock().await;

        // Double-check after acquiring the lock
        if let Some(cached) = self.get_fresh(key) {
            debug!(key, "Query cache hit (post-lock)");
            return Ok(cached);
        }

        let generation = self.generation(key);
        let value = match fetcher().await {
            Ok(value) => value,
            Err(e) if e.is_retryable() => {
                warn!(key, error = %e, "Query failed, retrying once");
                fetcher().await?
            }
            Err(e) => return Err(e),
        };

        if self.generation(key) != generation {
            debug!(key, "Query invalidated while fetching, not caching");
            return Ok(value);
        }

        self.insert(key, value.clone());
        debug!(key, "Query cached");
        Ok(value)
    }

    fn generation(&self, key: &str) -> u64 {
        *self.generations.entry(key.to_string()).or_insert(0)
    }

    fn fetch_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.fetch_locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Invalidates (removes) a cached entry.
    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
        if let Some(mut generation) = self.generations.get_mut(key) {
            *generation += 1;
        }
    }

    /// Removes `prefix` itself and every key below it (`/admin/rooms` also
    /// drops `/admin/rooms/7`).
    pub fn invalidate_prefix(&self, prefix: &str) {
        let below = format!("{}/", prefix.trim_end_matches('/'));
        let affected = |key: &String| key == prefix || key.starts_with(&below);

        self.entries.retain(|key, _| !affected(key));
        for mut generation in self.generations.iter_mut() {
            if affected(generation.key()) {
                *generation.value_mut() += 1;
            }
        }
    }

    /// Clears all entries from the cache.
    pub fn clear(&self) {
        self.entries.clear();
        for mut generation in self.generations.iter_mut() {
            *generation.value_mut() += 1;
        }
    }

    /// Drops entries not read for `gc_time`. Returns how many were removed.
    pub fn collect_garbage(&self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.last_read.elapsed() < self.gc_time);
        self.fetch_locks
            .retain(|key, lock| self.entries.contains_key(key) || Arc::strong_count(lock) > 1);
        self.generations
            .retain(|key, _| self.entries.contains_key(key) || self.fetch_locks.contains_key(key));
        before.saturating_sub(self.entries.len())
    }

    /// Returns the number of entries in the cache (including stale ones).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let mut total = 0;
        let mut stale = 0;

        for entry in self.entries.iter() {
            total += 1;
            if entry.fetched_at.elapsed() >= self.stale_time {
                stale += 1;
            }
        }

        CacheStats {
            total_entries: total,
            stale_entries: stale,
            fresh_entries: total - stale,
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::with_default_timings()
    }
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub stale_entries: usize,
    pub fresh_entries: usize,
}
