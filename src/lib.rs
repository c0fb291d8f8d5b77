pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod demo;
pub mod metrics;
pub mod models;
pub mod state;
pub mod store;
pub mod validation;

#[cfg(test)]
pub mod tests;

// Re-export specific items for convenience
pub use api::error::ApiError;
pub use api::route::create_router;
pub use cache::{CacheConfig, CacheKey, QueryCache, QueryState, QueryStatus, QuerySubscription, Tag};
pub use client::{FetchError, FetchRequest, FetchResponse, Fetcher, HttpFetcher, TrackedFetcher};
pub use metrics::{NetworkMetrics, NetworkTracker};
pub use models::{Item, ItemPatch};
