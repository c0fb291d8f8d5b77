//! List backed by the shared query cache

use super::items_api::{ItemUpdate, ItemsApi, ItemsQuery, DEFAULT_DELAY_MS};
use crate::cache::{QueryState, QuerySubscription};
use crate::client::FetchError;
use crate::models::{Item, ItemPatch};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

pub struct CachedList {
    api: ItemsApi,
    delay: u64,
    filter: Option<String>,
    subscription: Option<QuerySubscription<Vec<Item>>>,
    saving: Arc<watch::Sender<bool>>,
}

// Clears the saving flag however the mutation ends.
struct Saving<'a>(&'a watch::Sender<bool>);

impl Drop for Saving<'_> {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}

impl CachedList {
    pub fn new(api: ItemsApi) -> Self {
        let (saving, _) = watch::channel(false);
        Self {
            api,
            delay: DEFAULT_DELAY_MS,
            filter: None,
            subscription: None,
            saving: Arc::new(saving),
        }
    }

    pub fn with_delay(mut self, delay: u64) -> Self {
        self.delay = delay;
        self
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Switch to `filter`, releasing the previous query first
    pub fn set_filter(&mut self, filter: impl Into<String>) {
        let filter = filter.into();
        if self.filter.as_deref() == Some(filter.as_str()) {
            return;
        }

        if let Some(previous) = self.subscription.take() {
            previous.unsubscribe();
        }
        let query = ItemsQuery::new(filter.as_str()).with_delay(self.delay);
        self.subscription = Some(self.api.get_items(query));
        self.filter = Some(filter);
    }

    pub fn state(&self) -> QueryState<Vec<Item>> {
        self.subscription
            .as_ref()
            .map_or_else(QueryState::idle, QuerySubscription::state)
    }

    pub fn items(&self) -> Vec<Item> {
        self.state()
            .data()
            .map(|items| items.as_ref().clone())
            .unwrap_or_default()
    }

    /// Wait until the current query has no request outstanding
    pub async fn settled(&mut self) -> QueryState<Vec<Item>> {
        match self.subscription.as_mut() {
            Some(subscription) => subscription.settled().await,
            None => QueryState::idle(),
        }
    }

    pub fn status_line(&self) -> String {
        let state = self.state();
        if state.is_fetching || state.is_loading() {
            "Fetching…".to_string()
        } else {
            format!("Loaded {} items", state.data().map_or(0, |items| items.len()))
        }
    }

    pub fn error_message(&self) -> Option<String> {
        self.state().error().map(ToString::to_string)
    }

    pub fn is_saving(&self) -> bool {
        *self.saving.borrow()
    }

    pub fn subscribe_saving(&self) -> watch::Receiver<bool> {
        self.saving.subscribe()
    }

    pub fn button_label(&self) -> &'static str {
        if self.is_saving() {
            "Saving…"
        } else {
            "Mutate first item (invalidates cache)"
        }
    }

    /// Append a sparkle to the first item's name.
    ///
    /// Does nothing while another save is running or when the list is empty.
    pub async fn mutate_first(&self) -> Result<Option<Item>, FetchError> {
        let Some(first) = self.state().data().and_then(|items| items.first().cloned()) else {
            return Ok(None);
        };

        let started = self.saving.send_if_modified(|saving| {
            if *saving {
                false
            } else {
                *saving = true;
                true
            }
        });
        if !started {
            debug!("Save already in progress");
            return Ok(None);
        }
        let _saving = Saving(&self.saving);

        let update = ItemUpdate::new(first.id.clone(), ItemPatch::name(format!("{} ✨", first.name)))
            .with_delay(self.delay);
        self.api.update_item(update).await.map(Some)
    }
}
