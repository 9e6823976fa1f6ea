//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Version negotiation settings.
    pub api: ApiConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Plain, version-agnostic routes.
    pub routes: Vec<StaticRouteConfig>,

    /// Versioned API groups.
    pub groups: Vec<GroupConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum buffered request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Version negotiation configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Vendor name in `application/vnd.<vendor>.<version>+<format>`.
    pub vendor: String,

    /// Version used when the Accept header names none (or an unknown one).
    pub default_version: String,

    /// Format used when the Accept header names none (or an unknown one).
    pub default_format: String,

    /// Prefix applied to API groups that declare none.
    pub default_prefix: Option<String>,

    /// Domain applied to API groups that declare none.
    pub default_domain: Option<String>,

    /// Pretty-print JSON responses.
    pub pretty_json: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            vendor: "api".to_string(),
            default_version: "v1".to_string(),
            default_format: "json".to_string(),
            default_prefix: None,
            default_domain: None,
            pretty_json: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// A route answering with a fixed body (or failure).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StaticRouteConfig {
    /// HTTP method, or `ANY`.
    #[serde(default = "default_method")]
    pub method: String,

    /// URI template relative to the group prefix.
    pub path: String,

    /// Response body. Error statuses use it as the failure message.
    #[serde(default)]
    pub body: Value,

    /// 200, or an error status in 400..=599.
    #[serde(default = "default_status")]
    pub status: u16,

    /// Explicit protection, overriding the group default.
    #[serde(default)]
    pub protected: Option<bool>,

    /// Scopes appended after the group scopes.
    #[serde(default, deserialize_with = "one_or_many")]
    pub scopes: Vec<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_status() -> u16 {
    200
}

/// A versioned group of static routes.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GroupConfig {
    /// One version or a list of versions.
    #[serde(default, deserialize_with = "one_or_many")]
    pub version: Vec<String>,

    #[serde(default)]
    pub prefix: Option<String>,

    #[serde(default)]
    pub domain: Option<String>,

    #[serde(default)]
    pub protected: bool,

    /// One scope or a list of scopes.
    #[serde(default, deserialize_with = "one_or_many")]
    pub scopes: Vec<String>,

    #[serde(default)]
    pub routes: Vec<StaticRouteConfig>,
}

/// Accept either `"x"` or `["x", "y"]`.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.api.vendor, "api");
        assert_eq!(config.api.default_version, "v1");
        assert_eq!(config.api.default_format, "json");
        assert!(config.groups.is_empty());
    }

    #[test]
    fn test_version_and_scopes_accept_one_or_many() {
        let config: AppConfig = toml::from_str(
            r#"
            [api]
            vendor = "testing"

            [[groups]]
            version = "v1"
            scopes = "read"

            [[groups.routes]]
            path = "foo"
            body = "bar"

            [[groups]]
            version = ["v1", "v2"]
            scopes = ["read", "write"]
            protected = true
            "#,
        )
        .unwrap();

        assert_eq!(config.api.vendor, "testing");
        assert_eq!(config.api.default_version, "v1");
        assert_eq!(config.groups[0].version, vec!["v1"]);
        assert_eq!(config.groups[0].scopes, vec!["read"]);
        assert_eq!(config.groups[0].routes[0].method, "GET");
        assert_eq!(config.groups[0].routes[0].status, 200);
        assert_eq!(config.groups[1].version, vec!["v1", "v2"]);
        assert!(config.groups[1].protected);
    }
}
