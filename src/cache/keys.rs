//! Cache key and tag types

use std::collections::BTreeMap;
use std::fmt;

/// Canonical identity of a query: endpoint name plus its argument values.
///
/// Arguments are kept ordered by name, so the order in which they are added
/// never matters. Equality and hashing use the structured form; `Display` is
/// only meant for logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    endpoint: String,
    args: BTreeMap<String, String>,
}

impl CacheKey {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            args: BTreeMap::new(),
        }
    }

    /// Add (or replace) an argument
    pub fn arg(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.args.insert(name.into(), value.to_string());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn get_arg(&self, name: &str) -> Option<&str> {
        self.args.get(name).map(String::as_str)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.endpoint)?;
        for (i, (name, value)) in self.args.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, name, value)?;
        }
        Ok(())
    }
}

/// Label describing what a cached entry represents, e.g. `Items:LIST`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    kind: String,
    id: Option<String>,
}

impl Tag {
    /// Tag covering every entry of `kind`
    pub fn kind(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
        }
    }

    pub fn with_id(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: Some(id.into()),
        }
    }

    /// The conventional `<kind>:LIST` tag for collection queries
    pub fn list(kind: impl Into<String>) -> Self {
        Self::with_id(kind, "LIST")
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}:{}", self.kind, id),
            None => write!(f, "{}", self.kind),
        }
    }
}
