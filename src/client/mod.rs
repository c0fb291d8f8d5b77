pub mod fetch;
pub mod http;
pub mod tracked;

// Re-exports for convenience
pub use fetch::{FetchError, FetchRequest, FetchResponse, Fetcher};
pub use http::HttpFetcher;
pub use tracked::TrackedFetcher;
