//! Request lifecycle counters shared by everything that talks to the items API

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::trace;

/// Point-in-time view of the tracker counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkMetrics {
    pub total_requests: u64,
    pub completed: u64,
    pub in_flight: u64,
    pub cache_hits: u64,
    pub unique_urls: u64,
}

struct TrackerInner {
    urls: Mutex<HashSet<String>>,
    metrics: watch::Sender<NetworkMetrics>,
}

/// Observable network activity counters.
///
/// Cloning is cheap and every clone reports into the same counters. Each
/// mutating call publishes the new snapshot to all subscribers before it
/// returns.
#[derive(Clone)]
pub struct NetworkTracker {
    inner: Arc<TrackerInner>,
}

impl NetworkTracker {
    pub fn new() -> Self {
        let (metrics, _) = watch::channel(NetworkMetrics::default());
        Self {
            inner: Arc::new(TrackerInner {
                urls: Mutex::new(HashSet::new()),
                metrics,
            }),
        }
    }

    /// Current counters
    pub fn snapshot(&self) -> NetworkMetrics {
        *self.inner.metrics.borrow()
    }

    /// Subscribe to snapshot updates. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<NetworkMetrics> {
        self.inner.metrics.subscribe()
    }

    pub fn track_start(&self, url: &str) {
        let mut urls = self.inner.urls.lock().unwrap_or_else(PoisonError::into_inner);
        if !urls.contains(url) {
            urls.insert(url.to_string());
        }
        let unique = urls.len() as u64;
        self.inner.metrics.send_modify(|m| {
            m.total_requests += 1;
            m.in_flight += 1;
            m.unique_urls = unique;
        });
        trace!("request started: {}", url);
    }

    /// Record the end of a request. `from_cache` also counts it as a cache hit.
    pub fn track_end(&self, url: &str, from_cache: bool) {
        let _urls = self.inner.urls.lock().unwrap_or_else(PoisonError::into_inner);
        self.inner.metrics.send_modify(|m| {
            m.completed += 1;
            m.in_flight = m.in_flight.saturating_sub(1);
            if from_cache {
                m.cache_hits += 1;
            }
        });
        trace!("request finished: {}", url);
    }

    /// Count a consumer that was served from warm cache without a request of its own
    pub fn record_cache_hit(&self) {
        let _urls = self.inner.urls.lock().unwrap_or_else(PoisonError::into_inner);
        self.inner.metrics.send_modify(|m| m.cache_hits += 1);
        trace!("cache hit recorded");
    }

    /// Zero every counter and forget the URLs seen so far
    pub fn reset(&self) {
        let mut urls = self.inner.urls.lock().unwrap_or_else(PoisonError::into_inner);
        urls.clear();
        self.inner.metrics.send_replace(NetworkMetrics::default());
        trace!("tracker reset");
    }
}

impl Default for NetworkTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NetworkTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkTracker")
            .field("metrics", &self.snapshot())
            .finish()
    }
}
