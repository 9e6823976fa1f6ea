//! Failures raised while dispatching a request.

use std::fmt;

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;

use crate::routing::types::RouterError;

/// Any failure a handler (or the dispatcher itself) can raise.
#[derive(Debug, Error)]
pub enum ApiFailure {
    /// HTTP-style failure carrying an explicit status.
    #[error(transparent)]
    Http(#[from] HttpFailure),

    /// Validation failure on a resource (422).
    #[error(transparent)]
    Resource(#[from] ResourceFailure),

    /// Router misconfiguration detected at dispatch time (500).
    #[error(transparent)]
    Configuration(#[from] RouterError),

    /// Anything the translator cannot classify (500).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Discriminant of [`ApiFailure`], used to key override handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Http,
    Resource,
    Configuration,
    Other,
}

impl ApiFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Http(_) => FailureKind::Http,
            Self::Resource(_) => FailureKind::Resource,
            Self::Configuration(_) => FailureKind::Configuration,
            Self::Other(_) => FailureKind::Other,
        }
    }

    /// Shorthand for an [`HttpFailure`] without a message.
    pub fn http(status: StatusCode) -> Self {
        Self::Http(HttpFailure::new(status))
    }

    pub fn as_http(&self) -> Option<&HttpFailure> {
        match self {
            Self::Http(f) => Some(f),
            _ => None,
        }
    }
}

/// An HTTP failure with a status code and optional message.
#[derive(Debug, Clone, Error)]
#[error("HTTP {status}: {}", .message.as_deref().unwrap_or("(no message)"))]
pub struct HttpFailure {
    pub status: StatusCode,
    pub message: Option<String>,
    pub headers: HeaderMap,
}

impl HttpFailure {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            message: None,
            headers: HeaderMap::new(),
        }
    }

    /// Build from a raw status code; unknown codes degrade to 500.
    pub fn from_u16(status: u16) -> Self {
        Self::new(StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR))
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach a header to the eventual response (e.g. `Retry-After`).
    /// Invalid names or values are dropped.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }
}

/// The resource operation that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceAction {
    Store,
    Update,
    Delete,
    Other,
}

impl fmt::Display for ResourceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Store => "store",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Other => "resource",
        };
        f.write_str(name)
    }
}

/// A validation failure carrying per-field error messages.
#[derive(Debug, Clone, Error)]
#[error("{action} failed: {message}")]
pub struct ResourceFailure {
    pub action: ResourceAction,
    pub message: String,
    pub errors: ErrorBag,
}

impl ResourceFailure {
    pub fn new(message: impl Into<String>, errors: impl Into<ErrorBag>) -> Self {
        Self {
            action: ResourceAction::Other,
            message: message.into(),
            errors: errors.into(),
        }
    }

    pub fn store(message: impl Into<String>, errors: impl Into<ErrorBag>) -> Self {
        Self::new(message, errors).action(ResourceAction::Store)
    }

    pub fn update(message: impl Into<String>, errors: impl Into<ErrorBag>) -> Self {
        Self::new(message, errors).action(ResourceAction::Update)
    }

    pub fn delete(message: impl Into<String>, errors: impl Into<ErrorBag>) -> Self {
        Self::new(message, errors).action(ResourceAction::Delete)
    }

    fn action(mut self, action: ResourceAction) -> Self {
        self.action = action;
        self
    }
}

/// Ordered `field -> [message]` bag.
///
/// Fields keep their first-insertion order; messages for a field keep the
/// order they were added in. Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorBag {
    fields: Vec<(String, Vec<String>)>,
}

impl ErrorBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) -> &mut Self {
        let field = field.into();
        let message = message.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, messages)) => messages.push(message),
            None => self.fields.push((field, vec![message])),
        }
        self
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, messages)| messages.as_slice())
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Number of messages across all fields.
    pub fn count(&self) -> usize {
        self.fields.iter().map(|(_, messages)| messages.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ErrorBag
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = Self::new();
        for (field, message) in iter {
            bag.add(field, message);
        }
        bag
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for ErrorBag
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl Serialize for ErrorBag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, messages) in &self.fields {
            map.serialize_entry(field, messages)?;
        }
        map.end()
    }
}
