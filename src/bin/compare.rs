// Side-by-side run of the naive lists and the cached lists against the items
// API at ITEMS_API_URL, or an in-process mock when that is unset. Both sides
// mount two lists, walk the filter through alpha -> beta -> alpha, and the
// cached side then saves an item.

use items_cache_demo::{
    api,
    cache::CacheConfig,
    config::Config,
    demo::{CacheEnvironment, NaiveEnvironment},
    metrics::{NetworkMetrics, NetworkTracker},
    state::AppState,
    store::ItemStore,
    HttpFetcher,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use url::Url;

const FILTERS: [&str; 3] = ["alpha", "beta", "alpha"];

fn report(side: &str, metrics: NetworkMetrics) {
    info!(
        "[{}] requests: {}, completed: {}, in flight: {}, cache hits: {}, unique urls: {}",
        side,
        metrics.total_requests,
        metrics.completed,
        metrics.in_flight,
        metrics.cache_hits,
        metrics.unique_urls
    );
}

/// Serve the mock items API on an ephemeral port until `shutdown` is cancelled
async fn spawn_mock_api(
    config: &Config,
    shutdown: CancellationToken,
) -> Result<(Url, JoinHandle<()>), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let server_addr = listener.local_addr()?;
    info!("Starting mock items API on {}", server_addr);

    let app_state = Arc::new(AppState {
        config: config.clone(),
        store: ItemStore::seeded(),
    });
    let handle = tokio::spawn(async move {
        let app = api::create_router(app_state);
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await;
        if let Err(e) = result {
            error!("Server error: {}", e);
        }
    });

    Ok((Url::parse(&format!("http://{}/", server_addr))?, handle))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let config = Config::from_env();

    // 1. Use the configured items API, or start a mock one
    let shutdown = CancellationToken::new();
    let (base_url, server_handle) = match config.items_api_base()? {
        Some(url) => {
            info!("Using items API at {}", url);
            (url, None)
        }
        None => {
            let (url, handle) = spawn_mock_api(&config, shutdown.clone()).await?;
            (url, Some(handle))
        }
    };
    let fetcher = Arc::new(HttpFetcher::new(Duration::from_secs(config.http_timeout_secs))?);

    // 2. Naive side
    let naive = NaiveEnvironment::new(NetworkTracker::new(), fetcher.clone(), base_url.clone());
    let mut naive_lists = [
        naive.list().with_delay(config.naive_delay_ms),
        naive.list().with_delay(config.naive_delay_ms),
    ];
    for filter in FILTERS {
        for list in naive_lists.iter_mut() {
            list.set_filter(filter);
        }
        for list in naive_lists.iter() {
            let state = list.settled().await;
            info!("[naive] {}: {}", filter, state.status_line());
        }
    }
    report("naive", naive.tracker.snapshot());

    // 3. Cached side
    let cached = CacheEnvironment::new(
        NetworkTracker::new(),
        fetcher,
        base_url,
        CacheConfig::from(&config),
    );
    let mut cached_lists = [
        cached.list().with_delay(config.query_delay_ms),
        cached.list().with_delay(config.query_delay_ms),
    ];
    for filter in FILTERS {
        for list in cached_lists.iter_mut() {
            list.set_filter(filter);
        }
        for list in cached_lists.iter_mut() {
            list.settled().await;
            info!("[cached] {}: {}", filter, list.status_line());
        }
    }
    report("cached", cached.tracker.snapshot());

    // 4. Save through one list; both refresh from a single refetch
    match cached_lists[0].mutate_first().await {
        Ok(Some(item)) => info!("[cached] saved item {} as {:?}", item.id, item.name),
        Ok(None) => info!("[cached] nothing to save"),
        Err(e) => error!("[cached] save failed: {}", e),
    }
    for list in cached_lists.iter_mut() {
        let state = list.settled().await;
        if let Some(first) = state.data().and_then(|items| items.first()) {
            info!("[cached] first item now: {}", first.name);
        }
    }
    report("cached", cached.tracker.snapshot());

    // 5. Shut the mock server down, if we started one
    shutdown.cancel();
    if let Some(handle) = server_handle {
        let _ = handle.await;
    }

    Ok(())
}
