use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "graphql")]
use async_graphql::SimpleObject;

/// Running counters for how listing requests were served
#[derive(Debug, Default)]
pub(crate) struct FetchCounters {
    network_requests: AtomicU64,
    cache_hits: AtomicU64,
    joined_requests: AtomicU64,
    transport_failures: AtomicU64,
    malformed_responses: AtomicU64,
}

impl FetchCounters {
    pub fn record_network_request(&self) {
        self.network_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_joined(&self) {
        self.joined_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, kind: ErrorKind) {
        let counter = match kind {
            ErrorKind::Malformed => &self.malformed_responses,
            ErrorKind::Transport | ErrorKind::Task => &self.transport_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FetchStats {
        FetchStats {
            network_requests: self.network_requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            joined_requests: self.joined_requests.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            malformed_responses: self.malformed_responses.load(Ordering::Relaxed),
        }
    }
}

/// Fetch statistics
///
/// Callers always get a (possibly empty) listing back; these counters are
/// where an unreachable backend and a garbled response can be told apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "graphql", derive(SimpleObject))]
pub struct FetchStats {
    pub network_requests: u64,
    pub cache_hits: u64,
    pub joined_requests: u64,
    pub transport_failures: u64,
    pub malformed_responses: u64,
}
