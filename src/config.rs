// Configuration for the mock items service and the demo clients:
// - Server listening address/port
// - Items API base URL used by the clients
// - Cache retention for unused queries
// - Artificial latency defaults

use dotenv::dotenv;
use std::env;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    /// External items API for the demo clients; unset means `compare` serves its own
    pub items_api_url: Option<String>,
    pub http_timeout_secs: u64,
    pub keep_unused_data_for: Duration,
    pub mock_default_delay_ms: u64,
    pub mock_max_delay_ms: u64,
    pub query_delay_ms: u64,
    pub naive_delay_ms: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);
        let items_api_url = env::var("ITEMS_API_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());
        let http_timeout_secs = env::var("HTTP_TIMEOUT_SECS")
            .map(|v| v.parse().unwrap_or(30))
            .unwrap_or(30);
        let keep_unused_data_for = env::var("KEEP_UNUSED_DATA_FOR")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(60));
        let mock_default_delay_ms = env::var("MOCK_DEFAULT_DELAY_MS")
            .map(|v| v.parse().unwrap_or(400))
            .unwrap_or(400);
        let mock_max_delay_ms = env::var("MOCK_MAX_DELAY_MS")
            .map(|v| v.parse().unwrap_or(10_000))
            .unwrap_or(10_000);
        let query_delay_ms = env::var("QUERY_DELAY_MS")
            .map(|v| v.parse().unwrap_or(200))
            .unwrap_or(200);
        let naive_delay_ms = env::var("NAIVE_DELAY_MS")
            .map(|v| v.parse().unwrap_or(400))
            .unwrap_or(400);

        Self {
            server_host,
            server_port,
            items_api_url,
            http_timeout_secs,
            keep_unused_data_for,
            mock_default_delay_ms,
            mock_max_delay_ms,
            query_delay_ms,
            naive_delay_ms,
        }
    }
}

impl Config {
    /// Parsed `items_api_url`, with a trailing slash so API paths join under it
    pub fn items_api_base(&self) -> Result<Option<Url>, url::ParseError> {
        let Some(raw) = self.items_api_url.as_deref().map(str::trim) else {
            return Ok(None);
        };
        let url = if raw.ends_with('/') {
            Url::parse(raw)?
        } else {
            Url::parse(&format!("{}/", raw))?
        };
        Ok(Some(url))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 8080,
            items_api_url: None,
            http_timeout_secs: 30,
            keep_unused_data_for: Duration::from_secs(60),
            mock_default_delay_ms: 400,
            mock_max_delay_ms: 10_000,
            query_delay_ms: 200,
            naive_delay_ms: 400,
        }
    }
}
