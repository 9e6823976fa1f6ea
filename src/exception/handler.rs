//! Override exception handlers.
//!
//! An override handler is consulted before the built-in translation. When it
//! claims a failure its response is returned unmodified, for internal and
//! external requests alike.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::exception::failure::{ApiFailure, FailureKind};
use crate::http::response::ApiResponse;

/// Capability interface for custom failure handling.
pub trait ExceptionHandler: Send + Sync {
    /// Returns true if this handler wants to produce the response.
    fn will_handle(&self, failure: &ApiFailure) -> bool;

    /// Produce the response for a failure previously claimed by `will_handle`.
    fn handle(&self, failure: &ApiFailure) -> ApiResponse;
}

type FailureCallback = Arc<dyn Fn(&ApiFailure) -> ApiResponse + Send + Sync>;

/// A closure registry keyed by failure kind.
#[derive(Clone, Default)]
pub struct FailureHandlers {
    handlers: HashMap<FailureKind, FailureCallback>,
}

impl FailureHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for one kind of failure, replacing any previous one.
    pub fn register<F>(&mut self, kind: FailureKind, callback: F) -> &mut Self
    where
        F: Fn(&ApiFailure) -> ApiResponse + Send + Sync + 'static,
    {
        self.handlers.insert(kind, Arc::new(callback));
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl ExceptionHandler for FailureHandlers {
    fn will_handle(&self, failure: &ApiFailure) -> bool {
        self.handlers.contains_key(&failure.kind())
    }

    fn handle(&self, failure: &ApiFailure) -> ApiResponse {
        match self.handlers.get(&failure.kind()) {
            Some(callback) => callback(failure),
            None => ApiResponse::internal_error(),
        }
    }
}

impl fmt::Debug for FailureHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureHandlers")
            .field("kinds", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::failure::ResourceFailure;
    use axum::http::StatusCode;

    #[test]
    fn test_handles_registered_kinds_only() {
        let mut handlers = FailureHandlers::new();
        handlers.register(FailureKind::Http, |_| ApiResponse::raw("teapot", StatusCode::IM_A_TEAPOT));

        let http = ApiFailure::http(StatusCode::NOT_FOUND);
        let resource = ApiFailure::from(ResourceFailure::new("bad", [("foo", "bar")]));

        assert!(handlers.will_handle(&http));
        assert!(!handlers.will_handle(&resource));

        let response = handlers.handle(&http);
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(response.raw_body(), Some("teapot"));
    }
}
