//! Baseline list: every instance fetches for itself, nothing is shared

use super::items_api::ItemsQuery;
use crate::client::{FetchError, FetchResponse, Fetcher};
use crate::models::{Item, ItemsResponse};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;
use url::Url;

pub const NAIVE_DELAY_MS: u64 = 400;

/// What a list currently shows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListState {
    pub items: Option<Vec<Item>>,
    pub loading: bool,
    pub error: Option<String>,
}

impl ListState {
    pub fn status_line(&self) -> String {
        if self.loading {
            "Fetching…".to_string()
        } else {
            format!("Loaded {} items", self.items.as_ref().map_or(0, Vec::len))
        }
    }
}

/// A list that issues its own request whenever its filter changes.
///
/// Responses to a superseded filter are ignored; the request itself is not
/// aborted.
pub struct NaiveList {
    fetcher: Arc<dyn Fetcher>,
    base_url: Url,
    delay: u64,
    filter: Option<String>,
    generation: Arc<AtomicU64>,
    state: Arc<watch::Sender<ListState>>,
}

impl NaiveList {
    pub fn new(fetcher: Arc<dyn Fetcher>, base_url: Url) -> Self {
        let (state, _) = watch::channel(ListState::default());
        Self {
            fetcher,
            base_url,
            delay: NAIVE_DELAY_MS,
            filter: None,
            generation: Arc::new(AtomicU64::new(0)),
            state: Arc::new(state),
        }
    }

    pub fn with_delay(mut self, delay: u64) -> Self {
        self.delay = delay;
        self
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Show `filter`. A change always issues a fresh request.
    pub fn set_filter(&mut self, filter: impl Into<String>) {
        let filter = filter.into();
        if self.filter.as_deref() == Some(filter.as_str()) {
            return;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let call = ItemsQuery::new(filter.as_str())
            .with_delay(self.delay)
            .request(&self.base_url)
            .map(|request| self.fetcher.fetch(request));
        self.filter = Some(filter);

        let current = Arc::clone(&self.generation);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let outcome = load(call).await;
            if current.load(Ordering::SeqCst) != generation {
                debug!("Ignoring response for superseded generation {}", generation);
                return;
            }
            state.send_modify(|state| {
                match outcome {
                    Ok(items) => state.items = Some(items),
                    Err(err) => state.error = Some(err.to_string()),
                }
                state.loading = false;
            });
        });
    }

    pub fn state(&self) -> ListState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListState> {
        self.state.subscribe()
    }

    /// Wait until the latest request has been applied
    pub async fn settled(&self) -> ListState {
        let mut receiver = self.state.subscribe();
        let state = match receiver.wait_for(|state| !state.loading).await {
            Ok(state) => (*state).clone(),
            Err(_) => self.state(),
        };
        state
    }
}

impl Drop for NaiveList {
    fn drop(&mut self) {
        // Anything still in flight belongs to an unmounted list now.
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

type PendingCall = Result<BoxFuture<'static, Result<FetchResponse, FetchError>>, FetchError>;

async fn load(call: PendingCall) -> Result<Vec<Item>, FetchError> {
    let response = call?.await?;
    if !response.ok() {
        let status = response.status.as_u16();
        return Err(FetchError::Status {
            status,
            message: format!("HTTP {}", status),
        });
    }
    Ok(response.json::<ItemsResponse>()?.items)
}
