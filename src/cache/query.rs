//! Subscriber-counted query cache with tag invalidation and unused-entry expiry

use super::keys::{CacheKey, Tag};
use super::state::{QueryState, QueryStatus};
use crate::client::FetchError;
use crate::metrics::NetworkTracker;
use futures::future::BoxFuture;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

type FetchFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, FetchError>> + Send + Sync>;

/// Identifies one issued fetch. Only the newest token of an entry may settle it.
type RequestToken = u64;

/// Identifies one incarnation of an entry; a key recreated after `reset` gets a new one.
type EntryGeneration = u64;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long an entry with no subscribers is kept before eviction
    pub keep_unused_for: Duration,
}

impl CacheConfig {
    pub fn new(keep_unused_for: Duration) -> Self {
        Self { keep_unused_for }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

struct CacheEntry<T> {
    generation: EntryGeneration,
    tags: HashSet<Tag>,
    subscribers: usize,
    last_unsubscribed_at: Option<Instant>,
    pending: Option<RequestToken>,
    state: watch::Sender<QueryState<T>>,
    fetch: FetchFn<T>,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self, keep_unused_for: Duration) -> bool {
        self.subscribers == 0
            && self
                .last_unsubscribed_at
                .is_some_and(|at| at.elapsed() >= keep_unused_for)
    }
}

struct CacheInner<T> {
    entries: HashMap<CacheKey, CacheEntry<T>>,
    tag_index: HashMap<Tag, HashSet<CacheKey>>,
    next_token: u64,
}

/// A fetch registered under the lock, to be issued once the lock is released
struct PendingFetch<T> {
    key: CacheKey,
    token: RequestToken,
    fetch: FetchFn<T>,
}

impl<T> CacheInner<T> {
    fn next_id(&mut self) -> u64 {
        let id = self.next_token;
        self.next_token += 1;
        id
    }

    /// Mark `key` as fetching under a fresh token
    fn begin_fetch(&mut self, key: &CacheKey) -> Option<PendingFetch<T>> {
        let token = self.next_id();
        let entry = self.entries.get_mut(key)?;
        entry.pending = Some(token);
        entry.state.send_modify(|state| {
            state.is_fetching = true;
            if !state.is_success() {
                state.status = QueryStatus::Loading;
            }
        });
        Some(PendingFetch {
            key: key.clone(),
            token,
            fetch: Arc::clone(&entry.fetch),
        })
    }

    fn insert(&mut self, key: CacheKey, entry: CacheEntry<T>) {
        for tag in &entry.tags {
            self.tag_index.entry(tag.clone()).or_default().insert(key.clone());
        }
        self.entries.insert(key, entry);
    }

    fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry<T>> {
        let entry = self.entries.remove(key)?;
        for tag in &entry.tags {
            if let Some(keys) = self.tag_index.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.tag_index.remove(tag);
                }
            }
        }
        Some(entry)
    }
}

struct Shared<T> {
    config: CacheConfig,
    tracker: NetworkTracker,
    inner: Mutex<CacheInner<T>>,
}

/// Query cache handle. Clones share the same entries.
///
/// Guarantees:
/// - at most one fetch in flight per key; later subscribers attach to it,
/// - an invalidated key that has subscribers refetches exactly once, one
///   without subscribers is dropped,
/// - an unused entry survives for `keep_unused_for` and is evicted after,
/// - only the most recently issued fetch of a key may write its result.
///
/// Fetches run on spawned tokio tasks, so subscribing needs a runtime.
pub struct QueryCache<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for QueryCache<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for QueryCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

impl<T: Send + Sync + 'static> QueryCache<T> {
    pub fn new(config: CacheConfig, tracker: NetworkTracker) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                tracker,
                inner: Mutex::new(CacheInner {
                    entries: HashMap::new(),
                    tag_index: HashMap::new(),
                    next_token: 0,
                }),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.shared.config
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner<T>> {
        self.shared.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register interest in `key`.
    ///
    /// Warm data is returned right away and counted as a cache hit, a load
    /// already in flight is shared, and anything else triggers one fetch.
    /// `fetch` is called outside the cache lock, so it may read the cache.
    pub fn subscribe<F, Fut>(
        &self,
        key: CacheKey,
        tags: impl IntoIterator<Item = Tag>,
        fetch: F,
    ) -> QuerySubscription<T>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let fetch: FetchFn<T> = Arc::new(move || -> BoxFuture<'static, Result<T, FetchError>> {
            Box::pin(fetch())
        });
        let keep_unused_for = self.shared.config.keep_unused_for;
        let mut inner = self.lock();

        // Expired but not yet swept by its timer
        if inner
            .entries
            .get(&key)
            .is_some_and(|entry| entry.is_expired(keep_unused_for))
        {
            debug!("Dropping expired entry: {}", key);
            inner.remove(&key);
        }

        let (receiver, generation, needs_fetch) = match inner.entries.get_mut(&key) {
            Some(entry) => {
                entry.subscribers += 1;
                entry.last_unsubscribed_at = None;
                entry.fetch = fetch;

                let state = entry.state.borrow().clone();
                let needs_fetch = if state.is_success() {
                    debug!("Cache hit for key: {}", key);
                    self.shared.tracker.record_cache_hit();
                    false
                } else if entry.pending.is_some() {
                    debug!("Joining in-flight request for key: {}", key);
                    false
                } else {
                    true
                };
                (entry.state.subscribe(), entry.generation, needs_fetch)
            }
            None => {
                debug!("Cache miss for key: {}", key);
                let generation = inner.next_id();
                let (state, receiver) = watch::channel(QueryState::loading());
                let entry = CacheEntry {
                    generation,
                    tags: tags.into_iter().collect(),
                    subscribers: 1,
                    last_unsubscribed_at: None,
                    pending: None,
                    state,
                    fetch,
                };
                inner.insert(key.clone(), entry);
                (receiver, generation, true)
            }
        };

        let pending = if needs_fetch { inner.begin_fetch(&key) } else { None };
        drop(inner);
        if let Some(pending) = pending {
            self.issue(pending);
        }

        QuerySubscription {
            cache: self.clone(),
            key,
            generation,
            receiver,
            active: true,
        }
    }

    /// Run a write and, if it succeeds, invalidate `invalidates`.
    ///
    /// A failed write is returned as-is and schedules no refetch.
    pub async fn mutate<R, E, Fut>(&self, write: Fut, invalidates: &[Tag]) -> Result<R, E>
    where
        Fut: Future<Output = Result<R, E>>,
        E: fmt::Display,
    {
        match write.await {
            Ok(value) => {
                self.invalidate_tags(invalidates);
                Ok(value)
            }
            Err(err) => {
                warn!("Mutation failed, nothing invalidated: {}", err);
                Err(err)
            }
        }
    }

    /// Mark every entry carrying one of `tags` as stale.
    ///
    /// Subscribed entries refetch once each, unsubscribed ones are removed.
    /// Returns the number of refetches issued.
    pub fn invalidate_tags(&self, tags: &[Tag]) -> usize {
        let mut inner = self.lock();
        let keys: HashSet<CacheKey> = tags
            .iter()
            .filter_map(|tag| inner.tag_index.get(tag))
            .flatten()
            .cloned()
            .collect();

        let mut pending = Vec::new();
        let mut removed = 0;
        for key in keys {
            let subscribed = inner
                .entries
                .get(&key)
                .is_some_and(|entry| entry.subscribers > 0);
            if subscribed {
                pending.extend(inner.begin_fetch(&key));
            } else if inner.remove(&key).is_some() {
                removed += 1;
            }
        }
        drop(inner);

        let refetched = pending.len();
        for fetch in pending {
            self.issue(fetch);
        }

        info!(
            "Invalidated tags {:?}: {} refetched, {} dropped",
            tags.iter().map(Tag::to_string).collect::<Vec<_>>(),
            refetched,
            removed
        );
        refetched
    }

    /// Force a new fetch for a subscribed key. Returns `false` if nobody is subscribed.
    pub fn refetch(&self, key: &CacheKey) -> bool {
        let mut inner = self.lock();
        let subscribed = inner
            .entries
            .get(key)
            .is_some_and(|entry| entry.subscribers > 0);
        let pending = if subscribed { inner.begin_fetch(key) } else { None };
        drop(inner);
        if let Some(pending) = pending {
            self.issue(pending);
        }
        subscribed
    }

    /// Current state of `key`, or `None` if nothing is cached for it
    pub fn state(&self, key: &CacheKey) -> Option<QueryState<T>> {
        let inner = self.lock();
        inner
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired(self.shared.config.keep_unused_for))
            .map(|entry| entry.state.borrow().clone())
    }

    pub fn subscriber_count(&self, key: &CacheKey) -> usize {
        self.lock().entries.get(key).map_or(0, |entry| entry.subscribers)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry, subscribed or not
    pub fn reset(&self) {
        let mut inner = self.lock();
        let count = inner.entries.len();
        inner.entries.clear();
        inner.tag_index.clear();
        info!("Cache reset, {} entries dropped", count);
    }

    // Must be called without the lock held: the fetch fn may read the cache.
    fn issue(&self, pending: PendingFetch<T>) {
        let PendingFetch { key, token, fetch } = pending;
        debug!("Fetching {} (request #{})", key, token);
        let call = fetch();
        let shared = Arc::downgrade(&self.shared);
        tokio::spawn(async move {
            let result = call.await;
            // The result still lands in the cache when no subscriber is left.
            if let Some(shared) = shared.upgrade() {
                QueryCache { shared }.settle(&key, token, result);
            }
        });
    }

    fn settle(&self, key: &CacheKey, token: RequestToken, result: Result<T, FetchError>) {
        let mut inner = self.lock();
        let Some(entry) = inner.entries.get_mut(key) else {
            debug!("Discarding response #{} for evicted key: {}", token, key);
            return;
        };
        if entry.pending != Some(token) {
            debug!("Discarding stale response #{} for key: {}", token, key);
            return;
        }

        entry.pending = None;
        let status = match result {
            Ok(data) => {
                debug!("Cached response #{} for key: {}", token, key);
                QueryStatus::Success(Arc::new(data))
            }
            Err(err) => {
                warn!("Query {} failed: {}", key, err);
                QueryStatus::Error(err)
            }
        };
        entry.state.send_replace(QueryState {
            status,
            is_fetching: false,
        });
    }

    fn unsubscribe(&self, key: &CacheKey, generation: EntryGeneration) {
        let keep_unused_for = self.shared.config.keep_unused_for;
        let mut inner = self.lock();
        let Some(entry) = inner.entries.get_mut(key) else {
            return;
        };
        if entry.generation != generation {
            debug!("Ignoring release of a dropped entry for key: {}", key);
            return;
        }

        entry.subscribers = entry.subscribers.saturating_sub(1);
        if entry.subscribers > 0 {
            return;
        }
        entry.last_unsubscribed_at = Some(Instant::now());

        if keep_unused_for.is_zero() {
            debug!("Evicting unused key: {}", key);
            inner.remove(key);
            return;
        }

        // Without a runtime the entry is still expired lazily on next access.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let shared = Arc::downgrade(&self.shared);
            let key = key.clone();
            handle.spawn(async move {
                tokio::time::sleep(keep_unused_for).await;
                if let Some(shared) = shared.upgrade() {
                    QueryCache { shared }.evict_if_expired(&key);
                }
            });
        }
    }

    fn evict_if_expired(&self, key: &CacheKey) {
        let mut inner = self.lock();
        let expired = inner
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(self.shared.config.keep_unused_for));
        if expired {
            debug!("Evicting unused key: {}", key);
            inner.remove(key);
        }
    }
}

/// A live interest in one cache key.
///
/// Dropping it (or calling [`unsubscribe`](Self::unsubscribe)) releases the
/// interest and starts the unused-entry countdown once the last one is gone.
pub struct QuerySubscription<T: Send + Sync + 'static> {
    cache: QueryCache<T>,
    key: CacheKey,
    generation: EntryGeneration,
    receiver: watch::Receiver<QueryState<T>>,
    active: bool,
}

impl<T: Send + Sync + 'static> QuerySubscription<T> {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn state(&self) -> QueryState<T> {
        self.receiver.borrow().clone()
    }

    pub fn data(&self) -> Option<Arc<T>> {
        self.receiver.borrow().data().cloned()
    }

    /// Wait for the next state change. `None` once the entry is gone.
    pub async fn changed(&mut self) -> Option<QueryState<T>> {
        self.receiver.changed().await.ok()?;
        Some(self.state())
    }

    /// Wait until no request is outstanding and return the resulting state
    pub async fn settled(&mut self) -> QueryState<T> {
        match self.receiver.wait_for(QueryState::is_settled).await {
            Ok(state) => (*state).clone(),
            Err(_) => QueryState::idle(),
        }
    }

    pub fn refetch(&self) -> bool {
        self.cache.refetch(&self.key)
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.active {
            self.active = false;
            self.cache.unsubscribe(&self.key, self.generation);
        }
    }
}

impl<T: Send + Sync + 'static> Drop for QuerySubscription<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T: Send + Sync + 'static> fmt::Debug for QuerySubscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySubscription")
            .field("key", &self.key)
            .field("active", &self.active)
            .finish()
    }
}
