use crate::client::FetchError;
use std::sync::Arc;

/// Where a cached query currently stands
#[derive(Debug)]
pub enum QueryStatus<T> {
    /// Nothing requested yet
    Idle,
    /// First load in progress, no data to show
    Loading,
    Success(Arc<T>),
    Error(FetchError),
}

impl<T> Clone for QueryStatus<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Idle => Self::Idle,
            Self::Loading => Self::Loading,
            Self::Success(data) => Self::Success(Arc::clone(data)),
            Self::Error(err) => Self::Error(err.clone()),
        }
    }
}

/// Observable state of a cache entry.
///
/// A refetch of an entry that already holds data keeps the data visible and
/// only raises `is_fetching`.
#[derive(Debug)]
pub struct QueryState<T> {
    pub status: QueryStatus<T>,
    pub is_fetching: bool,
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status.clone(),
            is_fetching: self.is_fetching,
        }
    }
}

impl<T> QueryState<T> {
    pub fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            is_fetching: false,
        }
    }

    pub(crate) fn loading() -> Self {
        Self {
            status: QueryStatus::Loading,
            is_fetching: true,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, QueryStatus::Loading)
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, QueryStatus::Success(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self.status, QueryStatus::Error(_))
    }

    /// No request outstanding for this entry
    pub fn is_settled(&self) -> bool {
        !self.is_fetching && !self.is_loading()
    }

    pub fn data(&self) -> Option<&Arc<T>> {
        match &self.status {
            QueryStatus::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match &self.status {
            QueryStatus::Error(err) => Some(err),
            _ => None,
        }
    }
}
