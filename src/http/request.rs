//! Request types.
//!
//! # Responsibilities
//! - Define the buffered request type handlers receive
//! - Mark in-process (internal) requests
//! - Build internal requests that target a specific API version
//!
//! # Design Decisions
//! - Bodies are buffered before dispatch, so handlers stay synchronous
//! - The internal marker lives in request extensions and is never derived
//!   from client-controlled headers

use axum::http::{header, HeaderValue, Method, Request};
use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::routing::matcher::RouteParams;
use crate::routing::resolver::NegotiatedRequestContext;
use crate::routing::version::VersionId;

/// Header carrying the request correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// A request with a fully buffered body.
pub type ApiRequest = Request<Bytes>;

/// Extension marking a request as dispatched from inside the process.
///
/// Failures raised while handling an internal request propagate to the
/// calling code instead of being rendered as a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InternalRequest;

/// Accessors for data the dispatcher attaches to a request.
pub trait ApiRequestExt {
    fn is_internal(&self) -> bool;

    /// Mark the request as internal.
    fn mark_internal(&mut self);

    /// Negotiated vendor/version/format, present once an API route matched.
    fn negotiated(&self) -> Option<&NegotiatedRequestContext>;

    /// Captured path parameters, present once a route matched.
    fn route_params(&self) -> Option<&RouteParams>;

    /// Shorthand for a single captured path parameter.
    fn param(&self, name: &str) -> Option<&str> {
        self.route_params().and_then(|p| p.get(name))
    }
}

impl ApiRequestExt for ApiRequest {
    fn is_internal(&self) -> bool {
        self.extensions().get::<InternalRequest>().is_some()
    }

    fn mark_internal(&mut self) {
        self.extensions_mut().insert(InternalRequest);
    }

    fn negotiated(&self) -> Option<&NegotiatedRequestContext> {
        self.extensions().get::<NegotiatedRequestContext>()
    }

    fn route_params(&self) -> Option<&RouteParams> {
        self.extensions().get::<RouteParams>()
    }
}

/// Builder for internal requests.
///
/// Sets the vendor Accept header for the chosen version and format so the
/// request resolves exactly as an external client's would. Each request gets
/// a fresh `x-request-id`.
#[derive(Debug, Clone)]
pub struct InternalRequestBuilder {
    vendor: String,
    version: Option<VersionId>,
    format: String,
    method: Method,
    uri: String,
    body: Bytes,
    content_type: Option<&'static str>,
}

impl InternalRequestBuilder {
    pub fn new(vendor: impl Into<String>, method: Method, uri: impl Into<String>) -> Self {
        Self {
            vendor: vendor.into(),
            version: None,
            format: "json".to_string(),
            method,
            uri: uri.into(),
            body: Bytes::new(),
            content_type: None,
        }
    }

    /// Target a version. Without one, the router's default applies.
    pub fn version(mut self, version: VersionId) -> Self {
        self.version = Some(version);
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Serialize a JSON body.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        self.body = Bytes::from(serde_json::to_vec(body)?);
        self.content_type = Some("application/json");
        Ok(self)
    }

    pub fn build(self) -> Result<ApiRequest, axum::http::Error> {
        let uri = if self.uri.starts_with('/') {
            self.uri
        } else {
            format!("/{}", self.uri)
        };

        let mut builder = Request::builder()
            .method(self.method)
            .uri(uri)
            .header(X_REQUEST_ID, Uuid::new_v4().to_string());

        if let Some(version) = &self.version {
            let accept = format!("application/vnd.{}.{}+{}", self.vendor, version, self.format);
            builder = builder.header(header::ACCEPT, HeaderValue::try_from(accept)?);
        }
        if let Some(content_type) = self.content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }

        let mut request = builder.body(self.body)?;
        request.mark_internal();
        Ok(request)
    }
}
