use super::fetch::{FetchError, FetchRequest, FetchResponse, Fetcher};
use futures::future::BoxFuture;
use std::time::Duration;
use tracing::{debug, info};

/// `Fetcher` backed by a real HTTP client
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        info!("Initializing HTTP fetcher with timeout: {:?}", timeout);

        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<FetchResponse, FetchError>> {
        let client = self.client.clone();
        Box::pin(async move {
            debug!("{} {}", request.method, request.url);

            let mut builder = client.request(request.method, request.url);
            if let Some(body) = request.body {
                builder = builder.json(&body);
            }

            let response = builder.send().await?;
            let status = response.status();
            let body = response.text().await?;

            Ok(FetchResponse { status, body })
        })
    }
}
