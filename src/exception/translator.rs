//! Failure-to-response translation.
//!
//! # Responsibilities
//! - Give an override handler first refusal
//! - Map HTTP failures to their status, defaulting the message to the
//!   canonical phrase (`404 Not Found`)
//! - Map resource failures to 422 with a structured error bag
//! - Map everything else to a generic 500 without leaking detail
//!
//! # Design Decisions
//! - Translation is infallible; unknown failures degrade to 500
//! - Errors are built fresh per failure and never cached

use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;
use serde::Serialize;

use crate::exception::failure::{ApiFailure, ErrorBag};
use crate::exception::handler::ExceptionHandler;
use crate::http::response::ApiResponse;

/// The structured result of translating a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslatedError {
    #[serde(skip)]
    pub status: StatusCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ErrorBag>,
}

impl TranslatedError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            errors: None,
        }
    }

    /// An error whose message is the canonical phrase for its status.
    pub fn canonical(status: StatusCode) -> Self {
        Self::new(status, canonical_message(status))
    }
}

/// `"<code> <reason>"`, or just the code when no reason phrase is known.
pub fn canonical_message(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}

/// Converts failures into responses.
#[derive(Clone, Default)]
pub struct ExceptionTranslator {
    handler: Option<Arc<dyn ExceptionHandler>>,
}

impl ExceptionTranslator {
    pub fn new(handler: Option<Arc<dyn ExceptionHandler>>) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> Option<&Arc<dyn ExceptionHandler>> {
        self.handler.as_ref()
    }

    pub fn set_handler(&mut self, handler: Option<Arc<dyn ExceptionHandler>>) {
        self.handler = handler;
    }

    /// Whether the override handler claims this failure.
    pub fn is_claimed(&self, failure: &ApiFailure) -> bool {
        self.claiming_handler(failure).is_some()
    }

    /// The override handler, if it claims this failure.
    pub fn claiming_handler(&self, failure: &ApiFailure) -> Option<&Arc<dyn ExceptionHandler>> {
        self.handler.as_ref().filter(|h| h.will_handle(failure))
    }

    /// Produce the response for a failure.
    pub fn handle(&self, failure: &ApiFailure) -> ApiResponse {
        match self.claiming_handler(failure) {
            Some(handler) => {
                tracing::debug!(kind = ?failure.kind(), "Failure delegated to override handler");
                handler.handle(failure)
            }
            None => Self::respond(failure),
        }
    }

    /// Response from the built-in rules alone. Headers attached to an HTTP
    /// failure are carried over.
    pub fn respond(failure: &ApiFailure) -> ApiResponse {
        let mut response = ApiResponse::error(Self::translate(failure));
        if let ApiFailure::Http(http) = failure {
            response.headers_mut().extend(http.headers.clone());
        }
        response
    }

    /// Built-in translation rules.
    pub fn translate(failure: &ApiFailure) -> TranslatedError {
        match failure {
            ApiFailure::Http(http) => match http.message.as_deref().filter(|m| !m.is_empty()) {
                Some(message) => TranslatedError::new(http.status, message),
                None => TranslatedError::canonical(http.status),
            },
            ApiFailure::Resource(resource) => TranslatedError {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                message: resource.message.clone(),
                errors: Some(resource.errors.clone()),
            },
            ApiFailure::Configuration(err) => {
                tracing::error!(error = %err, "Router misconfiguration during dispatch");
                TranslatedError::canonical(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ApiFailure::Other(err) => {
                tracing::error!(error = %err, "Unhandled failure during dispatch");
                TranslatedError::canonical(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

impl fmt::Debug for ExceptionTranslator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionTranslator")
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::failure::{HttpFailure, ResourceFailure};
    use crate::http::response::Content;
    use crate::routing::types::RouterError;

    struct ClaimAll;

    impl ExceptionHandler for ClaimAll {
        fn will_handle(&self, _failure: &ApiFailure) -> bool {
            true
        }

        fn handle(&self, _failure: &ApiFailure) -> ApiResponse {
            ApiResponse::raw("testing", StatusCode::NOT_FOUND)
        }
    }

    struct ClaimNothing;

    impl ExceptionHandler for ClaimNothing {
        fn will_handle(&self, _failure: &ApiFailure) -> bool {
            false
        }

        fn handle(&self, _failure: &ApiFailure) -> ApiResponse {
            unreachable!("handle called for an unclaimed failure")
        }
    }

    #[test]
    fn test_http_failure_with_message() {
        let translator = ExceptionTranslator::new(Some(Arc::new(ClaimNothing)));
        let failure = ApiFailure::from(HttpFailure::not_found().with_message("testing"));

        let response = translator.handle(&failure);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        match response.content() {
            Content::Error(err) => assert_eq!(err.message, "testing"),
            other => panic!("unexpected content {other:?}"),
        }
    }

    #[test]
    fn test_http_failure_without_message() {
        let translated = ExceptionTranslator::translate(&ApiFailure::http(StatusCode::NOT_FOUND));
        assert_eq!(translated, TranslatedError::new(StatusCode::NOT_FOUND, "404 Not Found"));
        assert_eq!(serde_json::to_string(&translated).unwrap(), r#"{"message":"404 Not Found"}"#);

        let empty = ApiFailure::from(HttpFailure::new(StatusCode::FORBIDDEN).with_message(""));
        assert_eq!(ExceptionTranslator::translate(&empty).message, "403 Forbidden");
    }

    #[test]
    fn test_resource_failure() {
        let failure = ApiFailure::from(ResourceFailure::new("testing", [("foo", "bar")]));
        let translated = ExceptionTranslator::translate(&failure);

        assert_eq!(translated.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(translated.errors.as_ref().unwrap().get("foo").unwrap(), ["bar"]);
        assert_eq!(
            serde_json::to_string(&translated).unwrap(),
            r#"{"message":"testing","errors":{"foo":["bar"]}}"#
        );
    }

    #[test]
    fn test_resource_failure_with_empty_bag_keeps_errors() {
        let failure = ApiFailure::from(ResourceFailure::new("testing", ErrorBag::new()));
        let translated = ExceptionTranslator::translate(&failure);
        assert_eq!(serde_json::to_string(&translated).unwrap(), r#"{"message":"testing","errors":{}}"#);
    }

    #[test]
    fn test_unclassified_failures_become_500() {
        let other = ApiFailure::from(anyhow::anyhow!("database password is hunter2"));
        let translated = ExceptionTranslator::translate(&other);
        assert_eq!(translated.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(translated.message, "500 Internal Server Error");

        let config = ApiFailure::from(RouterError::MissingVersion);
        assert_eq!(ExceptionTranslator::translate(&config).status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_override_handler_takes_precedence() {
        let translator = ExceptionTranslator::new(Some(Arc::new(ClaimAll)));
        let failure = ApiFailure::http(StatusCode::NOT_FOUND);

        assert!(translator.is_claimed(&failure));
        let response = translator.handle(&failure);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.raw_body(), Some("testing"));
    }

    #[test]
    fn test_failure_headers_copied() {
        let translator = ExceptionTranslator::default();
        let failure = ApiFailure::from(
            HttpFailure::new(StatusCode::TOO_MANY_REQUESTS).with_header("retry-after", "5"),
        );
        let response = translator.handle(&failure);
        assert_eq!(response.headers()["retry-after"], "5");
    }

    #[test]
    fn test_canonical_message_unknown_status() {
        let status = StatusCode::from_u16(599).unwrap();
        assert_eq!(canonical_message(status), "599");
    }
}
