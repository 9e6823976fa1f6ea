//! Versioned API router library.
//!
//! Routes requests to per-version route collections selected from a vendor
//! media type in the `Accept` header, alongside ordinary version-agnostic
//! routes, and turns handler failures into consistent error responses.

pub mod config;
pub mod exception;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::AppConfig;
pub use exception::{ApiFailure, ExceptionHandler, ExceptionTranslator, HttpFailure, ResourceFailure};
pub use http::{ApiRequest, ApiRequestExt, ApiResponse, HttpServer};
pub use lifecycle::Shutdown;
pub use routing::{GroupOptions, Router, RouterBuilder};
