use crate::error::FetchError;
use crate::product::Product;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use futures::Future;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

#[cfg(feature = "graphql")]
use async_graphql::SimpleObject;

/// A fetch that any number of callers can await
pub type SharedFetch = Shared<BoxFuture<'static, Arc<[Product]>>>;

/// How a call was served by the deduplicator
pub enum Claim {
    /// A fresh listing turned up while the pending table was locked
    Cached(Arc<[Product]>),
    /// Another caller already started this fetch
    Joined(SharedFetch),
    /// This caller started the fetch
    Started(SharedFetch),
}

impl Claim {
    pub async fn resolve(self) -> Arc<[Product]> {
        match self {
            Claim::Cached(data) => data,
            Claim::Joined(fetch) | Claim::Started(fetch) => fetch.await,
        }
    }
}

struct PendingFetch {
    id: u64,
    fetch: SharedFetch,
}

/// Request deduplication system
/// When multiple identical requests come in, only the first one is executed
/// and its result is shared with every caller that arrives while it runs
#[derive(Default)]
pub struct RequestDeduplicator {
    pending: DashMap<String, PendingFetch>,
    next_id: AtomicU64,
    joined: AtomicU64,
}

/// Removes the pending entry once the fetch task settles, even on panic
struct PendingGuard {
    deduplicator: Arc<RequestDeduplicator>,
    key: String,
    id: u64,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.deduplicator
            .pending
            .remove_if(&self.key, |_, pending| pending.id == self.id);
        log::debug!("Request settled for endpoint: {}", self.key);
    }
}

impl RequestDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the in-flight fetch for `key`, or start one
    ///
    /// Lookup and insert happen under the pending table's entry lock, so at
    /// most one fetch per key is ever in flight. `cached` is consulted under
    /// the same lock before starting a new fetch. The fetch runs as its own
    /// task and completes even if every caller stops awaiting it.
    pub fn claim<C, F, Fut>(self: &Arc<Self>, key: &str, cached: C, fetch_fn: F) -> Claim
    where
        C: FnOnce() -> Option<Arc<[Product]>>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Arc<[Product]>> + Send + 'static,
    {
        let (id, shared, tx) = match self.pending.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                log::debug!("Request already pending for endpoint: {}", key);
                self.joined.fetch_add(1, Ordering::Relaxed);
                return Claim::Joined(entry.get().fetch.clone());
            }
            Entry::Vacant(entry) => {
                if let Some(data) = cached() {
                    return Claim::Cached(data);
                }

                log::debug!("Executing new request for endpoint: {}", key);
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let (tx, rx) = oneshot::channel::<Arc<[Product]>>();
                let endpoint = key.to_string();
                let shared = async move {
                    rx.await.unwrap_or_else(|_| {
                        let err = FetchError::Task {
                            endpoint,
                            reason: "fetch task ended without a result".to_string(),
                        };
                        log::warn!("{}", err);
                        Arc::from(Vec::new())
                    })
                }
                .boxed()
                .shared();

                entry.insert(PendingFetch {
                    id,
                    fetch: shared.clone(),
                });
                (id, shared, tx)
            }
        };

        // The entry lock is released here; the guard may now touch the table.
        let guard = PendingGuard {
            deduplicator: Arc::clone(self),
            key: key.to_string(),
            id,
        };
        let fetch = fetch_fn();
        tokio::spawn(async move {
            let _guard = guard;
            let data = fetch.await;
            let _ = tx.send(data);
        });

        Claim::Started(shared)
    }

    /// Execute a fetch with deduplication and wait for its result
    pub async fn execute<F, Fut>(self: &Arc<Self>, key: &str, fetch_fn: F) -> Arc<[Product]>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Arc<[Product]>> + Send + 'static,
    {
        self.claim(key, || None, fetch_fn).resolve().await
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.contains_key(key)
    }

    /// Get statistics about pending requests
    pub fn stats(&self) -> DeduplicationStats {
        DeduplicationStats {
            pending_requests: self.pending.len(),
            joined_requests: self.joined.load(Ordering::Relaxed),
        }
    }

    /// Forget all pending requests
    ///
    /// Running fetches still finish; later callers start new ones.
    pub fn clear(&self) {
        self.pending.clear();
        log::info!("Request deduplicator cleared");
    }
}

/// Statistics for request deduplication
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "graphql", derive(SimpleObject))]
pub struct DeduplicationStats {
    pub pending_requests: usize,
    pub joined_requests: u64,
}

/// Thread-safe wrapper for the deduplicator
pub type SharedRequestDeduplicator = Arc<RequestDeduplicator>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration as StdDuration;

    fn listing(id: i64) -> Arc<[Product]> {
        Arc::from(vec![Product::new(json!({ "id": id }))])
    }

    #[tokio::test]
    async fn test_request_deduplication() {
        let deduplicator = Arc::new(RequestDeduplicator::new());
        let execution_count = Arc::new(AtomicUsize::new(0));

        // Execute multiple identical requests concurrently
        let mut handles = vec![];
        for _ in 0..5 {
            let deduplicator = deduplicator.clone();
            let execution_count = execution_count.clone();

            let handle = tokio::spawn(async move {
                deduplicator
                    .execute("/api/monuments?category=single", || async move {
                        execution_count.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(StdDuration::from_millis(100)).await;
                        listing(1)
                    })
                    .await
            });

            handles.push(handle);
        }

        for handle in handles {
            let result = handle.await.unwrap();
            assert_eq!(result[0].id(), Some(1));
        }

        // Should have executed only once due to deduplication
        assert_eq!(execution_count.load(Ordering::SeqCst), 1);
        assert_eq!(deduplicator.stats().joined_requests, 4);
        assert_eq!(deduplicator.stats().pending_requests, 0);
    }

    #[tokio::test]
    async fn test_different_keys_not_deduplicated() {
        let deduplicator = Arc::new(RequestDeduplicator::new());
        let execution_count = Arc::new(AtomicUsize::new(0));

        let execution_count1 = execution_count.clone();
        let execution_count2 = execution_count.clone();

        let first = deduplicator.execute("/api/monuments?category=single", || async move {
            execution_count1.fetch_add(1, Ordering::SeqCst);
            listing(1)
        });
        let second = deduplicator.execute("/api/fences?category=granite", || async move {
            execution_count2.fetch_add(1, Ordering::SeqCst);
            listing(2)
        });
        let (first, second) = futures::join!(first, second);

        assert_eq!(first[0].id(), Some(1));
        assert_eq!(second[0].id(), Some(2));
        assert_eq!(execution_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_pending_entry_removed_when_caller_gives_up() {
        let deduplicator = Arc::new(RequestDeduplicator::new());
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let claim = deduplicator.claim(
            "/api/monuments?category=single",
            || None,
            || async move {
                let _ = release_rx.await;
                listing(1)
            },
        );
        assert!(deduplicator.is_pending("/api/monuments?category=single"));
        drop(claim);

        release_tx.send(()).unwrap();
        for _ in 0..50 {
            if !deduplicator.is_pending("/api/monuments?category=single") {
                break;
            }
            tokio::time::sleep(StdDuration::from_millis(10)).await;
        }
        assert!(!deduplicator.is_pending("/api/monuments?category=single"));
    }

    #[tokio::test]
    async fn test_panicking_fetch_resolves_empty_and_clears_pending() {
        let deduplicator = Arc::new(RequestDeduplicator::new());

        let result = deduplicator
            .execute("/api/fences?category=metal", || async move {
                if true {
                    panic!("backend exploded");
                }
                listing(1)
            })
            .await;

        assert!(result.is_empty());
        assert!(!deduplicator.is_pending("/api/fences?category=metal"));
    }

    #[tokio::test]
    async fn test_cached_listing_short_circuits_new_fetch() {
        let deduplicator = Arc::new(RequestDeduplicator::new());

        let claim = deduplicator.claim(
            "/api/monuments?category=single",
            || Some(listing(9)),
            || async move { listing(1) },
        );

        assert!(matches!(claim, Claim::Cached(_)));
        assert_eq!(claim.resolve().await[0].id(), Some(9));
        assert!(!deduplicator.is_pending("/api/monuments?category=single"));
    }
}
