pub mod cache;
pub mod client;
pub mod clock;
pub mod config;
pub mod deduplication;
pub mod endpoint;
mod error;
mod product;
mod stats;
mod subscription;


use cache::{CacheConfig, ProductCache, SharedProductCache};
use client::fetch_listing;
use clock::{SharedClock, SystemClock};
use deduplication::{Claim, RequestDeduplicator, SharedRequestDeduplicator};
use futures::future::join_all;
use futures::Future;
use stats::FetchCounters;
use std::sync::Arc;

pub use cache::{CacheStats, CachedProducts};
pub use client::http::SurfTransport;
pub use client::{ProductTransport, TransportResponse};
pub use config::FetchConfig;
pub use deduplication::DeduplicationStats;
pub use error::{ConfigError, ErrorKind, FetchError};
pub use product::Product;
pub use stats::FetchStats;
pub use subscription::{ProductsState, ProductsSubscription};

/// Catalog listing client with a per-endpoint TTL cache and request
/// deduplication.
///
/// Clones share the same cache, pending table and counters; build one per
/// process or session and hand clones to whatever renders product widgets.
#[derive(Clone)]
pub struct ProductFetchClient {
    transport: Arc<dyn ProductTransport>,
    cache: SharedProductCache,
    deduplicator: SharedRequestDeduplicator,
    counters: Arc<FetchCounters>,
}

impl ProductFetchClient {
    /// Create a client with the default 5 minute cache over `transport`
    pub fn new<T: ProductTransport + 'static>(transport: T) -> Self {
        Self::with_cache(transport, CacheConfig::default())
    }

    /// Create a client with a custom cache configuration
    pub fn with_cache<T: ProductTransport + 'static>(transport: T, cache_config: CacheConfig) -> Self {
        Self::with_parts(Arc::new(transport), cache_config, Arc::new(SystemClock))
    }

    /// Create a client from explicit parts, e.g. a manual clock in tests
    pub fn with_parts(
        transport: Arc<dyn ProductTransport>,
        cache_config: CacheConfig,
        clock: SharedClock,
    ) -> Self {
        Self {
            transport,
            cache: Arc::new(ProductCache::new(cache_config, clock)),
            deduplicator: Arc::new(RequestDeduplicator::new()),
            counters: Arc::new(FetchCounters::default()),
        }
    }

    /// Create a surf-backed client from configuration
    pub fn from_config(config: &FetchConfig) -> Result<Self, ConfigError> {
        let transport = SurfTransport::from_config(config)?;
        log::info!(
            "Initialized ProductFetchClient (base: {}, TTL: {}ms, cache enabled: {})",
            config.base_url(),
            config.cache_ttl_ms(),
            config.enabled()
        );
        Ok(Self::with_cache(transport, config.cache_config()))
    }

    /// Fetch one endpoint's products, at most once per TTL window
    ///
    /// Served from cache while fresh; otherwise joins an in-flight request
    /// for the same endpoint or starts one. Failures never surface here:
    /// they are logged and yield an empty listing.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn fetch_with_dedup(&self, endpoint: &str) -> Arc<[Product]> {
        if let Some(cached) = self.cache.get(endpoint) {
            self.counters.record_cache_hit();
            return cached;
        }

        let claim = self.deduplicator.claim(
            endpoint,
            || self.cache.get(endpoint),
            || self.fetch_and_store(endpoint.to_string()),
        );
        match &claim {
            Claim::Cached(_) => self.counters.record_cache_hit(),
            Claim::Joined(_) => self.counters.record_joined(),
            Claim::Started(_) => {}
        }
        claim.resolve().await
    }

    /// Fetch several endpoints in parallel and concatenate their products
    /// in the order the endpoints were given
    ///
    /// Must be called from within a tokio runtime.
    pub async fn fetch_all<S: AsRef<str>>(&self, endpoints: &[S]) -> Vec<Product> {
        let listings = join_all(
            endpoints
                .iter()
                .map(|endpoint| self.fetch_with_dedup(endpoint.as_ref())),
        )
        .await;

        listings
            .iter()
            .flat_map(|listing| listing.iter().cloned())
            .collect()
    }

    /// Subscribe to the concatenated products of `endpoints`
    ///
    /// Must be called from within a tokio runtime.
    pub fn use_products_cache<S: AsRef<str>>(&self, endpoints: &[S]) -> ProductsSubscription {
        ProductsSubscription::activate(self.clone(), endpoints)
    }

    fn fetch_and_store(&self, endpoint: String) -> impl Future<Output = Arc<[Product]>> + Send + 'static {
        let transport = Arc::clone(&self.transport);
        let cache = Arc::clone(&self.cache);
        let counters = Arc::clone(&self.counters);

        async move {
            counters.record_network_request();
            match fetch_listing(transport.as_ref(), &endpoint).await {
                Ok(products) => {
                    let data: Arc<[Product]> = products.into();
                    cache.put(&endpoint, data.clone(), cache.now());
                    data
                }
                Err(err) => {
                    counters.record_failure(err.kind());
                    let empty: Arc<[Product]> = Arc::from(Vec::new());
                    if err.caches_as_empty() {
                        // Wrongly shaped listings are cached as empty, same as a real empty one.
                        log::warn!("Treating listing as empty: {}", err);
                        cache.put(&endpoint, empty.clone(), cache.now());
                    } else {
                        log::warn!("Error fetching from {}: {}", endpoint, err);
                    }
                    empty
                }
            }
        }
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Get fetch statistics
    pub fn fetch_stats(&self) -> FetchStats {
        self.counters.snapshot()
    }

    /// Get deduplication statistics
    pub fn deduplication_stats(&self) -> DeduplicationStats {
        self.deduplicator.stats()
    }

    /// Number of endpoints with a request in flight
    pub fn pending_requests(&self) -> usize {
        self.deduplicator.stats().pending_requests
    }

    /// Drop one endpoint's cached listing
    pub fn invalidate(&self, endpoint: &str) -> bool {
        self.cache.remove(endpoint)
    }

    /// Clear the cache
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Evict expired cache entries
    pub fn evict_expired_cache(&self) -> usize {
        self.cache.evict_expired()
    }
}
