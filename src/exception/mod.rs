//! Failure handling subsystem.
//!
//! # Data Flow
//! ```text
//! Handler / dispatcher raises ApiFailure
//!     → translator.rs asks the override handler (handler.rs) first
//!     → otherwise applies built-in rules → TranslatedError
//!     → ApiResponse (formatted later by the negotiated response format)
//! ```
//!
//! # Design Decisions
//! - Translation happens only at the dispatch boundary
//! - The override handler is an explicit collaborator, not a global
//! - Internal requests skip translation unless the override claims the failure

pub mod failure;
pub mod handler;
pub mod translator;

pub use failure::{ApiFailure, ErrorBag, FailureKind, HttpFailure, ResourceAction, ResourceFailure};
pub use handler::{ExceptionHandler, FailureHandlers};
pub use translator::{canonical_message, ExceptionTranslator, TranslatedError};
