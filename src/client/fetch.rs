//! Request/response records and the `Fetcher` seam every data path goes through

use futures::future::BoxFuture;
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Non-success status. `message` is taken from the body when it carries one.
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}

/// An outgoing request. The URL is absolute so it doubles as the resource id.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<serde_json::Value>,
}

impl FetchRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            body: None,
        }
    }

    pub fn put<B: Serialize>(url: Url, body: &B) -> Result<Self, FetchError> {
        Ok(Self {
            method: Method::PUT,
            url,
            body: Some(serde_json::to_value(body)?),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub body: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl FetchResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Serialize `body` as a JSON response with the given status
    pub fn json_body<B: Serialize>(status: StatusCode, body: &B) -> Result<Self, FetchError> {
        Ok(Self::new(status, serde_json::to_string(body)?))
    }

    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    /// Turn a non-success status into `FetchError::Status`
    pub fn error_for_status(self) -> Result<Self, FetchError> {
        if self.ok() {
            return Ok(self);
        }
        let message = serde_json::from_str::<ErrorBody>(&self.body)
            .map(|b| b.message)
            .unwrap_or_else(|_| format!("HTTP {}", self.status.as_u16()));
        Err(FetchError::Status {
            status: self.status.as_u16(),
            message,
        })
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Anything that can issue a request and eventually hand back a response.
///
/// Non-success statuses are responses, not errors; `Err` is reserved for
/// requests that produced no response at all.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<FetchResponse, FetchError>>;
}
