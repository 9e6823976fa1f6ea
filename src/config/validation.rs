//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate version ids, methods, statuses and addresses
//! - Check the default version exists when groups are configured
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use axum::http::Method;

use crate::config::schema::{AppConfig, StaticRouteConfig};
use crate::routing::version::VersionId;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `groups[1].version`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Parse a configured method; `ANY` means every method.
pub fn parse_method(raw: &str) -> Result<Option<Method>, String> {
    let upper = raw.to_ascii_uppercase();
    if upper == "ANY" {
        return Ok(None);
    }
    Method::from_bytes(upper.as_bytes())
        .map(Some)
        .map_err(|_| format!("invalid HTTP method {raw:?}"))
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new("listener.bind_address", "not a socket address"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than zero"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new("observability.metrics_address", "not a socket address"));
    }

    let api = &config.api;
    if api.vendor.is_empty() || api.vendor.contains(['+', '/', ',', ';', ' ']) {
        errors.push(ValidationError::new("api.vendor", "must be a non-empty media-type token"));
    }
    if let Err(e) = VersionId::parse(&api.default_version) {
        errors.push(ValidationError::new("api.default_version", e.to_string()));
    }
    if api.default_format != "json" {
        errors.push(ValidationError::new("api.default_format", "only \"json\" is supported"));
    }

    for (i, route) in config.routes.iter().enumerate() {
        validate_route(&format!("routes[{i}]"), route, &mut errors);
    }

    let mut declared_default = false;
    for (i, group) in config.groups.iter().enumerate() {
        let field = format!("groups[{i}]");
        if group.version.is_empty() {
            errors.push(ValidationError::new(format!("{field}.version"), "at least one version is required"));
        }
        for version in &group.version {
            match VersionId::parse(version) {
                Ok(_) => declared_default |= *version == api.default_version,
                Err(e) => errors.push(ValidationError::new(format!("{field}.version"), e.to_string())),
            }
        }
        for (j, route) in group.routes.iter().enumerate() {
            validate_route(&format!("{field}.routes[{j}]"), route, &mut errors);
        }
    }

    if !config.groups.is_empty() && !declared_default {
        errors.push(ValidationError::new(
            "api.default_version",
            format!("version {:?} is not declared by any group", api.default_version),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_route(field: &str, route: &StaticRouteConfig, errors: &mut Vec<ValidationError>) {
    if let Err(message) = parse_method(&route.method) {
        errors.push(ValidationError::new(format!("{field}.method"), message));
    }
    if route.status != 200 && !(400..=599).contains(&route.status) {
        errors.push(ValidationError::new(
            format!("{field}.status"),
            "must be 200 or an error status (400-599)",
        ));
    }
}
