//! Response construction and formatting.
//!
//! # Responsibilities
//! - Carry a handler result, a translated error, or a raw body until the
//!   response format is known
//! - Encode values with the negotiated [`ResponseFormat`]
//! - Render plain (non-API) route results without the API envelope
//!
//! # Design Decisions
//! - Raw bodies (override handler responses) are emitted unmodified
//! - Handler values reach the formatter untouched; shaping is the
//!   formatter's job
//! - Encoding failures degrade to a plain 500, never a panic

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::http::{header, HeaderMap, HeaderValue, Response, StatusCode};
use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;

use crate::exception::translator::{canonical_message, TranslatedError};

/// A fully rendered response with a buffered body.
pub type HttpResponse = Response<Bytes>;

/// What a response carries before rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Emitted byte-for-byte.
    Raw(String),
    /// A handler's return value, passed to the formatter.
    Value(Value),
    /// A translated failure, serialized then passed to the formatter.
    Error(TranslatedError),
}

/// A response awaiting rendering.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    content: Content,
}

impl ApiResponse {
    pub fn new(content: Content, status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            content,
        }
    }

    pub fn raw(body: impl Into<String>, status: StatusCode) -> Self {
        Self::new(Content::Raw(body.into()), status)
    }

    pub fn value(value: Value) -> Self {
        Self::new(Content::Value(value), StatusCode::OK)
    }

    pub fn error(error: TranslatedError) -> Self {
        let status = error.status;
        Self::new(Content::Error(error), status)
    }

    pub fn internal_error() -> Self {
        Self::error(TranslatedError::canonical(StatusCode::INTERNAL_SERVER_ERROR))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn raw_body(&self) -> Option<&str> {
        match &self.content {
            Content::Raw(body) => Some(body),
            _ => None,
        }
    }

    /// Render using the negotiated format.
    pub fn render(self, format: &dyn ResponseFormat) -> HttpResponse {
        let encoded = match &self.content {
            Content::Raw(body) => Ok((Bytes::from(body.clone()), "text/plain; charset=utf-8")),
            Content::Value(value) => format.format(value).map(|b| (b, format.content_type())),
            Content::Error(error) => serde_json::to_value(error)
                .map_err(FormatError::from)
                .and_then(|v| format.format(&v))
                .map(|b| (b, format.content_type())),
        };

        match encoded {
            Ok((body, content_type)) => self.finish(body, content_type),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode response body");
                encoding_failure()
            }
        }
    }

    /// Render for a plain route: strings and messages as text, other values
    /// as compact JSON.
    pub fn render_plain(self) -> HttpResponse {
        let encoded = match &self.content {
            Content::Raw(body) | Content::Value(Value::String(body)) => {
                Ok((Bytes::from(body.clone()), "text/plain; charset=utf-8"))
            }
            Content::Error(error) => Ok((Bytes::from(error.message.clone()), "text/plain; charset=utf-8")),
            Content::Value(value) => serde_json::to_vec(value).map(|b| (Bytes::from(b), "application/json")),
        };

        match encoded {
            Ok((body, content_type)) => self.finish(body, content_type),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode plain response body");
                encoding_failure()
            }
        }
    }

    fn finish(self, body: Bytes, content_type: &str) -> HttpResponse {
        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        if !response.headers().contains_key(header::CONTENT_TYPE) {
            if let Ok(value) = HeaderValue::from_str(content_type) {
                response.headers_mut().insert(header::CONTENT_TYPE, value);
            }
        }
        response
    }
}

fn encoding_failure() -> HttpResponse {
    let mut response = Response::new(Bytes::from(canonical_message(StatusCode::INTERNAL_SERVER_ERROR)));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

/// Error raised by a response formatter.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Unsupported(String),
}

/// Encodes handler values into a wire format.
pub trait ResponseFormat: Send + Sync {
    fn content_type(&self) -> &str;

    fn format(&self, value: &Value) -> Result<Bytes, FormatError>;
}

/// JSON encoding. Bare strings are wrapped as `{"message": ...}`.
#[derive(Debug, Clone, Default)]
pub struct JsonFormat {
    pretty: bool,
}

impl JsonFormat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl ResponseFormat for JsonFormat {
    fn content_type(&self) -> &str {
        "application/json"
    }

    fn format(&self, value: &Value) -> Result<Bytes, FormatError> {
        let wrapped;
        let value = match value {
            Value::String(message) => {
                wrapped = serde_json::json!({ "message": message });
                &wrapped
            }
            other => other,
        };

        let encoded = if self.pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        Ok(Bytes::from(encoded))
    }
}

/// Registered response formats, keyed by the `+<format>` token.
#[derive(Clone)]
pub struct Formats {
    formats: HashMap<String, Arc<dyn ResponseFormat>>,
}

impl Formats {
    pub fn empty() -> Self {
        Self {
            formats: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, format: Arc<dyn ResponseFormat>) -> &mut Self {
        self.formats.insert(name.into().to_ascii_lowercase(), format);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ResponseFormat>> {
        self.formats.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }
}

impl Default for Formats {
    fn default() -> Self {
        let mut formats = Self::empty();
        formats.register("json", Arc::new(JsonFormat::new()));
        formats
    }
}

impl fmt::Debug for Formats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.formats.keys().collect();
        names.sort();
        f.debug_struct("Formats").field("names", &names).finish()
    }
}
