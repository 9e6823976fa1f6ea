//! Route collections and the per-version registry.
//!
//! # Design Decisions
//! - One ordered collection per version id; first structural match wins
//! - A route registered under several versions is stored once per version,
//!   sharing its handler and metadata
//! - Versions are never removed; looking up an unknown version is an error

use std::collections::HashMap;

use crate::http::request::ApiRequest;
use crate::routing::matcher::RouteParams;
use crate::routing::route::Route;
use crate::routing::types::{RouterError, RouterResult};
use crate::routing::version::VersionId;

/// An ordered list of routes.
#[derive(Debug, Clone, Default)]
pub struct RouteCollection {
    routes: Vec<Route>,
}

impl RouteCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, route: Route) {
        self.routes.push(route);
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// First route structurally matching the request.
    pub fn find(&self, req: &ApiRequest) -> Option<(&Route, RouteParams)> {
        self.routes
            .iter()
            .find_map(|route| route.matches(req).map(|params| (route, params)))
    }
}

/// Version id → route collection.
#[derive(Debug, Clone, Default)]
pub struct RouteCollectionRegistry {
    collections: HashMap<VersionId, RouteCollection>,
}

impl RouteCollectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route to a version's collection, creating it on first use.
    pub fn register(&mut self, version: VersionId, route: Route) {
        self.collections.entry(version).or_default().push(route);
    }

    pub fn lookup(&self, version: &VersionId) -> RouterResult<&RouteCollection> {
        self.collections
            .get(version)
            .ok_or_else(|| RouterError::UnknownVersion(version.clone()))
    }

    pub fn has(&self, version: &VersionId) -> bool {
        self.collections.contains_key(version)
    }

    /// Registered versions, sorted.
    pub fn versions(&self) -> Vec<&VersionId> {
        let mut versions: Vec<_> = self.collections.keys().collect();
        versions.sort();
        versions
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VersionId, &RouteCollection)> {
        self.collections.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::route::{Handler, RouteAction};
    use axum::http::{Method, Request};
    use bytes::Bytes;
    use serde_json::json;
    use std::sync::Arc;

    fn route(uri: &str, body: &'static str) -> Route {
        Route::new(
            vec![Method::GET],
            uri,
            Arc::new(RouteAction::default()),
            Handler::new(move |_| Ok(json!(body))),
        )
    }

    fn v(id: &str) -> VersionId {
        VersionId::parse(id).unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = RouteCollectionRegistry::new();
        registry.register(v("v1"), route("foo", "bar"));
        registry.register(v("v1"), route("baz", "qux"));

        let collection = registry.lookup(&v("v1")).unwrap();
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.routes()[0].uri(), "foo");
        assert!(registry.has(&v("v1")));
    }

    #[test]
    fn test_unknown_version_is_an_error() {
        let registry = RouteCollectionRegistry::new();
        assert_eq!(
            registry.lookup(&v("v1")).unwrap_err(),
            RouterError::UnknownVersion(v("v1"))
        );
        assert!(!registry.has(&v("v1")));
    }

    #[test]
    fn test_first_match_wins() {
        let mut collection = RouteCollection::new();
        collection.push(route("users/{id}", "param"));
        collection.push(route("users/me", "literal"));

        let req = Request::get("/users/me").body(Bytes::new()).unwrap();
        let (matched, params) = collection.find(&req).unwrap();
        assert_eq!(matched.uri(), "users/{id}");
        assert_eq!(params.get("id"), Some("me"));
    }

    #[test]
    fn test_versions_sorted() {
        let mut registry = RouteCollectionRegistry::new();
        registry.register(v("v2"), route("a", "a"));
        registry.register(v("v1.1"), route("a", "a"));
        let versions: Vec<_> = registry.versions().into_iter().map(|v| v.as_str()).collect();
        assert_eq!(versions, vec!["v1.1", "v2"]);
    }
}
