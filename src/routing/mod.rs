//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (at startup):
//!     RouterBuilder::api(GroupOptions, callback)
//!     → group.rs (merge prefix/domain/protection/scopes)
//!     → route.rs (resolve handler declarations into RouteAction)
//!     → collection.rs (one ordered RouteCollection per version)
//!     → RouterBuilder::build() → immutable Router
//!
//! Incoming Request (host, path, Accept header)
//!     → router.rs (API or plain?)
//!     → media_type.rs (vendor/version/format from Accept)
//!     → resolver.rs (requested version, else default)
//!     → matcher.rs (method, domain, path template)
//!     → handler → ResponseFormat, or ExceptionTranslator on failure
//! ```
//!
//! # Design Decisions
//! - Routes registered at startup, immutable at runtime
//! - No regex in hot path (literal and `{param}` segments only)
//! - Deterministic: same input always matches same route
//! - First match wins (registration order)

pub mod collection;
pub mod group;
pub mod matcher;
pub mod media_type;
pub mod resolver;
pub mod route;
pub mod router;
pub mod types;
pub mod version;

pub use collection::{RouteCollection, RouteCollectionRegistry};
pub use group::{GroupAttributes, GroupOptions, RouteGroup};
pub use matcher::RouteParams;
pub use media_type::{Accept, MediaTypeParser};
pub use resolver::{NegotiatedRequestContext, VersionResolver};
pub use route::{handler, Action, Controller, Declaration, Handler, Route, RouteAction};
pub use router::{Router, RouterBuilder, RouterSettings};
pub use types::{RouterError, RouterResult};
pub use version::VersionId;
