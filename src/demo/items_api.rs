//! The `getItems` query and `updateItem` mutation bound to a query cache

use crate::cache::{CacheKey, QueryCache, QueryState, QuerySubscription, Tag};
use crate::client::{FetchError, FetchRequest, Fetcher};
use crate::models::{Item, ItemPatch, ItemsResponse};
use std::sync::Arc;
use tracing::info;
use url::Url;

pub const ITEMS_PATH: &str = "api/demos/items";
pub const DEFAULT_DELAY_MS: u64 = 200;

/// Tag provided by every list query and invalidated by every item update
pub fn items_list_tag() -> Tag {
    Tag::list("Items")
}

/// Arguments of the `getItems` query
#[derive(Debug, Clone, PartialEq)]
pub struct ItemsQuery {
    pub filter: String,
    pub delay: u64,
    pub error: f64,
}

impl ItemsQuery {
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            delay: DEFAULT_DELAY_MS,
            error: 0.0,
        }
    }

    pub fn with_delay(mut self, delay: u64) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_error_rate(mut self, error: f64) -> Self {
        self.error = error;
        self
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new("getItems")
            .arg("filter", &self.filter)
            .arg("delay", self.delay)
            .arg("error", self.error)
    }

    pub fn request(&self, base_url: &Url) -> Result<FetchRequest, FetchError> {
        let mut url = base_url.join(ITEMS_PATH)?;
        url.query_pairs_mut()
            .append_pair("filter", &self.filter)
            .append_pair("delay", &self.delay.to_string())
            .append_pair("error", &self.error.to_string());
        Ok(FetchRequest::get(url))
    }
}

/// Arguments of the `updateItem` mutation
#[derive(Debug, Clone, PartialEq)]
pub struct ItemUpdate {
    pub id: String,
    pub patch: ItemPatch,
    pub delay: u64,
}

impl ItemUpdate {
    pub fn new(id: impl Into<String>, patch: ItemPatch) -> Self {
        Self {
            id: id.into(),
            patch,
            delay: DEFAULT_DELAY_MS,
        }
    }

    pub fn with_delay(mut self, delay: u64) -> Self {
        self.delay = delay;
        self
    }

    pub fn request(&self, base_url: &Url) -> Result<FetchRequest, FetchError> {
        let mut url = base_url.join(&format!("{}/{}", ITEMS_PATH, self.id))?;
        url.query_pairs_mut()
            .append_pair("delay", &self.delay.to_string());
        FetchRequest::put(url, &self.patch)
    }
}

/// Items endpoints sharing one cache.
///
/// Clones share the cache and the fetcher.
#[derive(Clone)]
pub struct ItemsApi {
    fetcher: Arc<dyn Fetcher>,
    base_url: Url,
    cache: QueryCache<Vec<Item>>,
}

impl ItemsApi {
    pub fn new(fetcher: Arc<dyn Fetcher>, base_url: Url, cache: QueryCache<Vec<Item>>) -> Self {
        Self {
            fetcher,
            base_url,
            cache,
        }
    }

    pub fn cache(&self) -> &QueryCache<Vec<Item>> {
        &self.cache
    }

    /// Subscribe to the item list for `query`
    pub fn get_items(&self, query: ItemsQuery) -> QuerySubscription<Vec<Item>> {
        let key = query.cache_key();
        let fetcher = Arc::clone(&self.fetcher);
        let base_url = self.base_url.clone();

        // The request is issued when the cache calls this, not when the task is first polled.
        self.cache.subscribe(key, [items_list_tag()], move || {
            let call = query.request(&base_url).map(|request| fetcher.fetch(request));
            async move {
                let response = call?.await?.error_for_status()?;
                Ok::<_, FetchError>(response.json::<ItemsResponse>()?.items)
            }
        })
    }

    /// Cached state for `query` without subscribing
    pub fn cached_items(&self, query: &ItemsQuery) -> Option<QueryState<Vec<Item>>> {
        self.cache.state(&query.cache_key())
    }

    /// Save `update` and refresh every list query that is in use
    pub async fn update_item(&self, update: ItemUpdate) -> Result<Item, FetchError> {
        info!("Updating item {}", update.id);

        let write = async {
            let request = update.request(&self.base_url)?;
            let response = self.fetcher.fetch(request).await?.error_for_status()?;
            response.json::<Item>()
        };

        self.cache.mutate(write, &[items_list_tag()]).await
    }
}
