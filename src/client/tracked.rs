//! Observability decorator over any `Fetcher`

use super::fetch::{FetchError, FetchRequest, FetchResponse, Fetcher};
use crate::metrics::NetworkTracker;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Reports every request it forwards to a `NetworkTracker`.
///
/// Requests and responses pass through unchanged.
#[derive(Clone)]
pub struct TrackedFetcher {
    inner: Arc<dyn Fetcher>,
    tracker: NetworkTracker,
}

impl TrackedFetcher {
    pub fn new(inner: Arc<dyn Fetcher>, tracker: NetworkTracker) -> Self {
        Self { inner, tracker }
    }

    pub fn tracker(&self) -> &NetworkTracker {
        &self.tracker
    }
}

// Ends the request when dropped, whether the call resolved, failed or was abandoned.
struct InFlight {
    tracker: NetworkTracker,
    url: String,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.tracker.track_end(&self.url, false);
    }
}

impl Fetcher for TrackedFetcher {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<FetchResponse, FetchError>> {
        let url = request.url.to_string();
        self.tracker.track_start(&url);
        let guard = InFlight {
            tracker: self.tracker.clone(),
            url,
        };

        let call = self.inner.fetch(request);
        Box::pin(async move {
            let _guard = guard;
            call.await
        })
    }
}
