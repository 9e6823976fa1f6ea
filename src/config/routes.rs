//! Config-declared routes.
//!
//! Turns the `[[routes]]` and `[[groups]]` tables into a [`Router`]. Each
//! route answers with its configured body, or raises an HTTP failure carrying
//! the body as its message when the status is an error.

use serde_json::Value;

use crate::config::schema::{AppConfig, StaticRouteConfig};
use crate::config::validation::parse_method;
use crate::exception::failure::HttpFailure;
use crate::routing::group::{GroupOptions, RouteGroup};
use crate::routing::route::{Declaration, Handler};
use crate::routing::router::{Router, RouterBuilder, RouterSettings};
use crate::routing::types::RouterResult;

/// Handler answering with a fixed body or failure.
pub fn static_handler(route: &StaticRouteConfig) -> Handler {
    let body = route.body.clone();
    let status = route.status;

    if status == 200 {
        return Handler::new(move |_| Ok(body.clone()));
    }

    let message = match body {
        Value::Null => None,
        Value::String(message) => Some(message),
        other => Some(other.to_string()),
    };
    Handler::new(move |_| {
        let failure = HttpFailure::from_u16(status);
        Err(match &message {
            Some(message) => failure.with_message(message.clone()),
            None => failure,
        }
        .into())
    })
}

fn register(group: &mut RouteGroup<'_>, route: &StaticRouteConfig) {
    let method = match parse_method(&route.method) {
        Ok(method) => method,
        Err(e) => {
            tracing::warn!(path = %route.path, error = %e, "Skipping route with invalid method");
            return;
        }
    };

    let declaration = Declaration {
        protected: route.protected,
        scopes: route.scopes.clone(),
    };
    let action = static_handler(route).declare(declaration);

    match method {
        Some(method) => group.matches(&[method], &route.path, action),
        None => group.any(&route.path, action),
    };
}

/// Build a router from configuration.
pub fn build_router(config: &AppConfig) -> RouterResult<Router> {
    let mut builder = RouterBuilder::with_settings(RouterSettings::from_config(&config.api));

    builder.group(Default::default(), |plain| {
        for route in &config.routes {
            register(plain, route);
        }
    });

    for group in &config.groups {
        let mut options = GroupOptions::new()
            .versions(group.version.iter().cloned())
            .protected(group.protected)
            .scopes(group.scopes.iter().cloned());
        if let Some(prefix) = &group.prefix {
            options = options.prefix(prefix.clone());
        }
        if let Some(domain) = &group.domain {
            options = options.domain(domain.clone());
        }

        builder.api(options, |api| {
            for route in &group.routes {
                register(api, route);
            }
        })?;
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_config;
    use axum::http::{header, Request, StatusCode};
    use bytes::Bytes;

    const CONFIG: &str = r#"
        [api]
        vendor = "acme"
        default_version = "v1"

        [[routes]]
        path = "health"
        body = "ok"

        [[groups]]
        version = ["v1", "v2"]
        prefix = "api"
        protected = true
        scopes = "read"

        [[groups.routes]]
        path = "users/{id}"
        body = { name = "jane" }
        scopes = ["users"]

        [[groups.routes]]
        method = "delete"
        path = "users/{id}"
        status = 403
        body = "Forbidden for you"
        protected = false
    "#;

    fn router() -> Router {
        build_router(&parse_config(CONFIG).unwrap()).unwrap()
    }

    fn send(router: &Router, method: &str, uri: &str) -> crate::http::response::HttpResponse {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::ACCEPT, "application/vnd.acme.v2+json")
            .body(Bytes::new())
            .unwrap();
        router.dispatch(req).unwrap()
    }

    #[test]
    fn test_config_routes_registered() {
        let router = router();
        let routes = router.api_collection("v2").unwrap().routes();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].uri(), "api/users/{id}");
        assert!(routes[0].action().protected);
        assert_eq!(routes[0].action().scopes, vec!["read", "users"]);
        assert!(!routes[1].action().protected);
        assert_eq!(router.plain_routes().len(), 1);
    }

    #[test]
    fn test_static_body() {
        let response = send(&router(), "GET", "/api/users/1");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), br#"{"name":"jane"}"#);
    }

    #[test]
    fn test_static_failure() {
        let response = send(&router(), "DELETE", "/api/users/1");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response.body().as_ref(), br#"{"message":"Forbidden for you"}"#);
    }

    #[test]
    fn test_plain_config_route() {
        let response = send(&router(), "GET", "/health");
        assert_eq!(response.body().as_ref(), b"ok");
    }
}
