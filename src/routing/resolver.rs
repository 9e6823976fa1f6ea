//! Version resolution.
//!
//! # Responsibilities
//! - Pick the version a request targets: the requested one when it is
//!   registered, otherwise the configured default
//! - Pick the response format: the requested one when a formatter exists,
//!   otherwise the configured default
//!
//! # Design Decisions
//! - Exact string match only; `v2` never falls through to `v2.0.1`
//! - An unregistered default version is a configuration error, not a 404

use serde::Serialize;

use crate::http::response::Formats;
use crate::routing::collection::RouteCollectionRegistry;
use crate::routing::media_type::Accept;
use crate::routing::types::{RouterError, RouterResult};
use crate::routing::version::VersionId;

/// Per-request negotiation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NegotiatedRequestContext {
    pub vendor: String,
    pub version: VersionId,
    pub format: String,
    pub internal: bool,
}

/// Resolves the effective version and format for a request.
#[derive(Debug, Clone)]
pub struct VersionResolver<'a> {
    pub vendor: &'a str,
    pub default_version: &'a str,
    pub default_format: &'a str,
}

impl VersionResolver<'_> {
    pub fn resolve(
        &self,
        accept: Option<&Accept>,
        registry: &RouteCollectionRegistry,
        formats: &Formats,
        internal: bool,
    ) -> RouterResult<NegotiatedRequestContext> {
        let version = match accept.map(|a| &a.version).filter(|v| registry.has(v)) {
            Some(requested) => requested.clone(),
            None => self.default_version(registry)?,
        };

        let format = accept
            .map(|a| a.format.as_str())
            .filter(|f| formats.contains(f))
            .unwrap_or(self.default_format)
            .to_string();

        Ok(NegotiatedRequestContext {
            vendor: accept
                .map(|a| a.vendor.clone())
                .unwrap_or_else(|| self.vendor.to_string()),
            version,
            format,
            internal,
        })
    }

    fn default_version(&self, registry: &RouteCollectionRegistry) -> RouterResult<VersionId> {
        let version = VersionId::parse(self.default_version)
            .map_err(|_| RouterError::DefaultVersionUnregistered(self.default_version.to_string()))?;

        if registry.has(&version) {
            Ok(version)
        } else {
            Err(RouterError::DefaultVersionUnregistered(self.default_version.to_string()))
        }
    }
}
