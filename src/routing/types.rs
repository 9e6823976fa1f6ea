//! Routing error definitions.

use thiserror::Error;

use crate::routing::version::VersionId;

/// Configuration errors raised while registering or resolving routes.
///
/// These indicate a programming or deployment mistake rather than a bad
/// client request. At dispatch time they surface as a 500.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouterError {
    /// An API group was declared without any version.
    #[error("API route groups require at least one version")]
    MissingVersion,

    /// A version identifier was empty or contained unsupported characters.
    #[error("Invalid version identifier {0:?}")]
    InvalidVersion(String),

    /// A collection was requested for a version that was never registered.
    #[error("No API route collection registered for version {0}")]
    UnknownVersion(VersionId),

    /// The configured default version has no registered routes.
    #[error("Default version {0} has no registered API routes")]
    DefaultVersionUnregistered(String),

    /// A route referenced a controller method that does not exist.
    #[error("Controller {controller} has no method {method}")]
    UnknownControllerMethod { controller: String, method: String },

    /// No response formatter is registered for the default format.
    #[error("No response format registered for default format {0:?}")]
    UnknownFormat(String),
}

/// Result type for routing operations.
pub type RouterResult<T> = Result<T, RouterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RouterError::UnknownVersion(VersionId::parse("v3").unwrap());
        assert_eq!(err.to_string(), "No API route collection registered for version v3");

        let err = RouterError::UnknownControllerMethod {
            controller: "UserController".into(),
            method: "show".into(),
        };
        assert!(err.to_string().contains("UserController"));
    }
}
