// Serves the mock items API:
// - Load configuration
// - Set up logging
// - Seed the in-memory store
// - Start HTTP server

use items_cache_demo::{api, config::Config, state::AppState, store::ItemStore};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting items-cache-demo");

    // Load configuration
    let config = Config::from_env();
    tracing::info!("Configuration loaded: {:?}", config);

    // Create shared state
    let store = ItemStore::seeded();
    tracing::info!("Item store seeded with {} items", store.len().await);
    let app_state = Arc::new(AppState {
        config: config.clone(),
        store,
    });

    // Start HTTP server
    let app = api::create_router(app_state);
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
