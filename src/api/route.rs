use crate::{
    api::{error::ApiError, response},
    models::ItemPatch,
    state::AppState,
    validation::{validate_delay, validate_error_rate, validate_item_id},
};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

// GET /api/demos/items query parameters
#[derive(Debug, Deserialize)]
pub struct ItemsQuery {
    filter: Option<String>,
    delay: Option<String>,
    error: Option<String>,
}

// PUT /api/demos/items/{id} query parameters
#[derive(Debug, Deserialize)]
pub struct UpdateQuery {
    delay: Option<String>,
}

// Create router with all routes
pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/demos/items", get(list_items))
        .route("/api/demos/items/{id}", put(update_item))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

// GET /api/demos/items handler
async fn list_items(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ItemsQuery>,
) -> Result<Response, ApiError> {
    let delay = validate_delay(
        params.delay.as_deref(),
        state.config.mock_default_delay_ms,
        state.config.mock_max_delay_ms,
    )?;
    let error_rate = validate_error_rate(params.error.as_deref())?;

    info!("Listing items with filter: {:?}, delay: {}ms, error rate: {}",
          params.filter, delay, error_rate);

    tokio::time::sleep(Duration::from_millis(delay)).await;

    if rand::random::<f64>() < error_rate {
        warn!("Injecting failure for filter: {:?}", params.filter);
        return Err(ApiError::InjectedFailure);
    }

    let items = state.store.list(params.filter.as_deref()).await;
    Ok(response::items_with_total_count(items))
}

// PUT /api/demos/items/{id} handler
async fn update_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<UpdateQuery>,
    Json(patch): Json<ItemPatch>,
) -> Result<Response, ApiError> {
    validate_item_id(&id)?;
    let delay = validate_delay(
        params.delay.as_deref(),
        state.config.mock_default_delay_ms,
        state.config.mock_max_delay_ms,
    )?;

    info!("Updating item {} after {}ms", id, delay);

    tokio::time::sleep(Duration::from_millis(delay)).await;

    let saved = state.store.upsert(&id, patch).await;
    Ok(response::item(&saved))
}
