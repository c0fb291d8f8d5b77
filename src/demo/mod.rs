//! Composition of tracker, fetchers, cache and list components for the
//! side-by-side comparison. Each side gets its own tracker so their numbers
//! can be read independently.

pub mod cached;
pub mod items_api;
pub mod naive;

pub use cached::CachedList;
pub use items_api::{items_list_tag, ItemUpdate, ItemsApi, ItemsQuery};
pub use naive::{ListState, NaiveList};

use crate::cache::{CacheConfig, QueryCache};
use crate::client::{Fetcher, TrackedFetcher};
use crate::metrics::NetworkTracker;
use std::sync::Arc;
use url::Url;

/// The cache-backed side: one tracked fetcher, one cache, any number of lists
pub struct CacheEnvironment {
    pub tracker: NetworkTracker,
    pub api: ItemsApi,
}

impl CacheEnvironment {
    pub fn new(tracker: NetworkTracker, fetcher: Arc<dyn Fetcher>, base_url: Url, config: CacheConfig) -> Self {
        let tracked: Arc<dyn Fetcher> = Arc::new(TrackedFetcher::new(fetcher, tracker.clone()));
        let cache = QueryCache::new(config, tracker.clone());
        Self {
            api: ItemsApi::new(tracked, base_url, cache),
            tracker,
        }
    }

    /// Mount a new list
    pub fn list(&self) -> CachedList {
        CachedList::new(self.api.clone())
    }
}

/// The baseline side: lists share only the tracked fetcher
pub struct NaiveEnvironment {
    pub tracker: NetworkTracker,
    fetcher: Arc<dyn Fetcher>,
    base_url: Url,
}

impl NaiveEnvironment {
    pub fn new(tracker: NetworkTracker, fetcher: Arc<dyn Fetcher>, base_url: Url) -> Self {
        Self {
            fetcher: Arc::new(TrackedFetcher::new(fetcher, tracker.clone())),
            tracker,
            base_url,
        }
    }

    pub fn list(&self) -> NaiveList {
        NaiveList::new(Arc::clone(&self.fetcher), self.base_url.clone())
    }
}
