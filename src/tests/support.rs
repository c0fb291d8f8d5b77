//! Fetchers and fixtures shared by the test modules

use crate::client::{FetchError, FetchRequest, FetchResponse, Fetcher};
use crate::models::{Item, ItemPatch, ItemsResponse};
use futures::future::BoxFuture;
use reqwest::{Method, StatusCode};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use url::Url;

pub fn base_url() -> Url {
    Url::parse("http://tests/").unwrap()
}

fn item(id: &str, name: &str, category: &str) -> Item {
    Item {
        id: id.to_string(),
        name: name.to_string(),
        category: category.to_string(),
        updated_at: 1_700_000_000_000,
    }
}

pub fn alpha_items() -> Vec<Item> {
    vec![item("1", "Alpha One", "alpha"), item("2", "Alpha Two", "alpha")]
}

pub fn updated_alpha_items() -> Vec<Item> {
    vec![
        item("1", "Alpha One (Updated)", "alpha"),
        item("2", "Alpha Two", "alpha"),
    ]
}

pub fn beta_items() -> Vec<Item> {
    vec![item("3", "Beta Three", "beta")]
}

pub fn items_response(items: &[Item]) -> Result<FetchResponse, FetchError> {
    FetchResponse::json_body(
        StatusCode::OK,
        &ItemsResponse {
            items: items.to_vec(),
        },
    )
}

pub fn error_response(status: StatusCode, message: &str) -> Result<FetchResponse, FetchError> {
    FetchResponse::json_body(status, &serde_json::json!({ "message": message }))
}

type Handler = dyn Fn(&FetchRequest) -> Result<FetchResponse, FetchError> + Send + Sync;

/// Answers every request through a closure and records what it saw
pub struct MockFetcher {
    handler: Box<Handler>,
    latency: Duration,
    calls: AtomicUsize,
    requests: Mutex<Vec<FetchRequest>>,
}

impl MockFetcher {
    pub fn new<H>(handler: H) -> Arc<Self>
    where
        H: Fn(&FetchRequest) -> Result<FetchResponse, FetchError> + Send + Sync + 'static,
    {
        Self::with_latency(Duration::ZERO, handler)
    }

    pub fn with_latency<H>(latency: Duration, handler: H) -> Arc<Self>
    where
        H: Fn(&FetchRequest) -> Result<FetchResponse, FetchError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            latency,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<FetchResponse, FetchError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = (self.handler)(&request);
        self.requests.lock().unwrap().push(request);

        let latency = self.latency;
        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            result
        })
    }
}

/// Hands out responses in call order, each released by the test through a oneshot sender
pub struct ScriptedFetcher {
    calls: AtomicUsize,
    pending: Mutex<VecDeque<oneshot::Receiver<Result<FetchResponse, FetchError>>>>,
}

pub type Responder = oneshot::Sender<Result<FetchResponse, FetchError>>;

impl ScriptedFetcher {
    /// A fetcher for `count` calls plus the senders completing them, in call order
    pub fn new(count: usize) -> (Arc<Self>, Vec<Responder>) {
        let (senders, receivers): (Vec<_>, VecDeque<_>) = (0..count).map(|_| oneshot::channel()).unzip();
        let fetcher = Arc::new(Self {
            calls: AtomicUsize::new(0),
            pending: Mutex::new(receivers),
        });
        (fetcher, senders)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Fetcher for ScriptedFetcher {
    fn fetch(&self, _request: FetchRequest) -> BoxFuture<'static, Result<FetchResponse, FetchError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.pending.lock().unwrap().pop_front();
        Box::pin(async move {
            match next {
                Some(receiver) => receiver
                    .await
                    .unwrap_or_else(|_| Err(FetchError::Transport("responder dropped".to_string()))),
                None => Err(FetchError::Transport("no scripted response left".to_string())),
            }
        })
    }
}

/// Minimal items backend speaking the mock API's wire format
pub struct FakeItemsBackend {
    items: Mutex<Vec<Item>>,
}

impl FakeItemsBackend {
    pub fn new(items: Vec<Item>) -> Arc<Self> {
        Arc::new(Self {
            items: Mutex::new(items),
        })
    }

    pub fn handle(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let path = request.url.path();
        if request.method == Method::GET && path == "/api/demos/items" {
            let filter = request
                .url
                .query_pairs()
                .find(|(name, _)| name == "filter")
                .map(|(_, value)| value.to_lowercase())
                .unwrap_or_default();
            let items: Vec<Item> = self
                .items
                .lock()
                .unwrap()
                .iter()
                .filter(|item| {
                    item.name.to_lowercase().contains(&filter) || item.category.contains(&filter)
                })
                .cloned()
                .collect();
            return items_response(&items);
        }

        if request.method == Method::PUT {
            if let Some(id) = path.strip_prefix("/api/demos/items/") {
                let patch: ItemPatch = serde_json::from_value(request.body.clone().unwrap_or_default())?;
                let mut items = self.items.lock().unwrap();
                if let Some(item) = items.iter_mut().find(|item| item.id == id) {
                    if let Some(name) = patch.name {
                        item.name = name;
                    }
                    return FetchResponse::json_body(StatusCode::OK, &*item);
                }
                return error_response(StatusCode::NOT_FOUND, "no such item");
            }
        }

        Err(FetchError::Transport(format!("Unexpected request: {} {}", request.method, request.url)))
    }
}
