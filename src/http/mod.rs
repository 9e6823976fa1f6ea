//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, body buffering)
//!     → request.rs (ApiRequest, internal marker, extensions)
//!     → [routing layer negotiates version and runs handler]
//!     → response.rs (format value or translated error)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{ApiRequest, ApiRequestExt, InternalRequest, InternalRequestBuilder, X_REQUEST_ID};
pub use response::{ApiResponse, Content, Formats, HttpResponse, JsonFormat, ResponseFormat};
pub use server::HttpServer;
