use crate::endpoint::endpoints_key;
use crate::product::Product;
use crate::ProductFetchClient;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// What a consumer of a product listing sees.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductsState {
    pub products: Vec<Product>,
    pub loading: bool,
}

impl Default for ProductsState {
    fn default() -> Self {
        Self {
            products: Vec::new(),
            loading: true,
        }
    }
}

struct Published {
    sender: watch::Sender<ProductsState>,
    generation: AtomicU64,
    disposed: AtomicBool,
}

impl Published {
    /// Mark a new load as current and flag the state as loading.
    fn begin(&self) -> u64 {
        let mut generation = 0;
        self.sender.send_modify(|state| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            state.loading = true;
        });
        generation
    }

    /// Publish the result of load `generation` unless it was superseded or
    /// the subscription is gone.
    fn finish(&self, generation: u64, products: Vec<Product>) -> bool {
        self.sender.send_if_modified(|state| {
            if self.disposed.load(Ordering::SeqCst) {
                log::debug!("Dropping products for disposed subscription");
                return false;
            }
            if self.generation.load(Ordering::SeqCst) != generation {
                log::debug!("Dropping products of superseded load {}", generation);
                return false;
            }
            *state = ProductsState {
                products,
                loading: false,
            };
            true
        })
    }
}

/// A live view over the concatenated products of several endpoints.
///
/// Created by [`ProductFetchClient::use_products_cache`]. Loads run as
/// background tasks on the current tokio runtime. Dropping the subscription
/// mid-load is fine: the fetches still warm the cache, but nothing is
/// published any more.
pub struct ProductsSubscription {
    client: ProductFetchClient,
    endpoints: Vec<String>,
    key: String,
    published: Arc<Published>,
    state: watch::Receiver<ProductsState>,
}

impl ProductsSubscription {
    pub(crate) fn activate<S: AsRef<str>>(client: ProductFetchClient, endpoints: &[S]) -> Self {
        let (sender, state) = watch::channel(ProductsState::default());
        let endpoints: Vec<String> = endpoints.iter().map(|e| e.as_ref().to_string()).collect();
        let subscription = Self {
            client,
            key: endpoints_key(&endpoints),
            endpoints,
            published: Arc::new(Published {
                sender,
                generation: AtomicU64::new(0),
                disposed: AtomicBool::new(false),
            }),
            state,
        };
        subscription.load();
        subscription
    }

    fn load(&self) {
        let generation = self.published.begin();
        let client = self.client.clone();
        let endpoints = self.endpoints.clone();
        let published = Arc::clone(&self.published);

        log::debug!("Loading products for [{}]", self.key);
        tokio::spawn(async move {
            let products = client.fetch_all(&endpoints).await;
            published.finish(generation, products);
        });
    }

    /// Point the subscription at a new endpoint list.
    ///
    /// Reloads only when the list differs structurally from the current
    /// one; returns whether a reload was started.
    pub fn set_endpoints<S: AsRef<str>>(&mut self, endpoints: &[S]) -> bool {
        let key = endpoints_key(endpoints);
        if key == self.key {
            return false;
        }

        self.endpoints = endpoints.iter().map(|e| e.as_ref().to_string()).collect();
        self.key = key;
        self.load();
        true
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    pub fn state(&self) -> ProductsState {
        self.state.borrow().clone()
    }

    pub fn products(&self) -> Vec<Product> {
        self.state.borrow().products.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Wait for the next published change.
    pub async fn changed(&mut self) -> ProductsState {
        // The sender lives as long as `self`, so this cannot fail.
        let _ = self.state.changed().await;
        self.state.borrow_and_update().clone()
    }

    /// Wait until no load is in progress.
    pub async fn loaded(&mut self) -> ProductsState {
        let loaded = self
            .state
            .wait_for(|state| !state.loading)
            .await
            .map(|state| state.clone());
        loaded.unwrap_or_else(|_| self.state())
    }

    /// Stop publishing results. Equivalent to dropping the subscription.
    pub fn dispose(self) {}
}

impl Drop for ProductsSubscription {
    fn drop(&mut self) {
        self.published.disposed.store(true, Ordering::SeqCst);
    }
}
