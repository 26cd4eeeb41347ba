use crate::clock::SharedClock;
use crate::product::Product;
use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[cfg(feature = "graphql")]
use async_graphql::SimpleObject;

/// Configuration for the product cache
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// How long a fetched listing stays fresh
    pub ttl: Duration,
    /// Whether caching is enabled
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(5),
            enabled: true,
        }
    }
}

impl CacheConfig {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, enabled: true }
    }
}

/// Products fetched from one endpoint, with the time they were stored
#[derive(Clone, Debug)]
pub struct CachedProducts {
    pub data: Arc<[Product]>,
    pub created_at: DateTime<Utc>,
}

impl CachedProducts {
    pub fn new(data: Arc<[Product]>, created_at: DateTime<Utc>) -> Self {
        Self { data, created_at }
    }

    /// An entry is fresh while its age is strictly below the TTL
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.created_at < ttl
    }
}

/// Endpoint-keyed cache of product listings
pub struct ProductCache {
    cache: DashMap<String, CachedProducts>,
    clock: SharedClock,
    pub config: CacheConfig,
}

impl ProductCache {
    pub fn new(config: CacheConfig, clock: SharedClock) -> Self {
        Self {
            cache: DashMap::new(),
            clock,
            config,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Get the cached listing if it is still fresh
    ///
    /// Stale entries are left in place; they are replaced by the next
    /// successful fetch or dropped by `evict_expired`.
    pub fn get(&self, endpoint: &str) -> Option<Arc<[Product]>> {
        if !self.config.enabled {
            return None;
        }

        let now = self.clock.now();
        match self.cache.get(endpoint) {
            Some(cached) if cached.is_fresh(now, self.config.ttl) => {
                log::debug!("Cache hit for endpoint: {}", endpoint);
                Some(cached.data.clone())
            }
            Some(_) => {
                log::debug!("Cache expired for endpoint: {}", endpoint);
                None
            }
            None => {
                log::debug!("Cache miss for endpoint: {}", endpoint);
                None
            }
        }
    }

    /// Store a listing fetched at `fetched_at`, swapping the whole entry
    ///
    /// A listing older than the one already stored is ignored so that
    /// timestamps only move forward.
    pub fn put(&self, endpoint: &str, data: Arc<[Product]>, fetched_at: DateTime<Utc>) {
        if !self.config.enabled {
            return;
        }

        let cached = CachedProducts::new(data, fetched_at);
        match self.cache.entry(endpoint.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().created_at > fetched_at {
                    log::debug!("Ignoring older listing for endpoint: {}", endpoint);
                    return;
                }
                entry.insert(cached);
            }
            Entry::Vacant(entry) => {
                entry.insert(cached);
            }
        }
        log::debug!("Stored listing in cache for endpoint: {}", endpoint);
    }

    /// Drop a single endpoint's entry
    pub fn remove(&self, endpoint: &str) -> bool {
        self.cache.remove(endpoint).is_some()
    }

    /// Remove expired entries from cache
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.config.ttl;
        let before = self.cache.len();
        self.cache.retain(|_, cached| cached.is_fresh(now, ttl));
        let evicted = before.saturating_sub(self.cache.len());

        log::debug!("Evicted {} expired cache entries", evicted);
        evicted
    }

    /// Clear all cache entries
    pub fn clear(&self) {
        self.cache.clear();
        log::info!("Product cache cleared");
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let (valid_entries, expired_entries) =
            self.cache.iter().fold((0, 0), |(valid, expired), entry| {
                if entry.value().is_fresh(now, self.config.ttl) {
                    (valid + 1, expired)
                } else {
                    (valid, expired + 1)
                }
            });

        CacheStats {
            total_entries: valid_entries + expired_entries,
            valid_entries,
            expired_entries,
            ttl_ms: self.config.ttl.num_milliseconds(),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "graphql", derive(SimpleObject))]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub ttl_ms: i64,
}

/// Thread-safe wrapper for the cache
pub type SharedProductCache = Arc<ProductCache>;
