//! Route registration and dispatch.
//!
//! # Responsibilities
//! - Collect versioned API groups and plain routes ([`RouterBuilder`])
//! - Decide whether a request targets the API or a plain route
//! - Negotiate version and format, invoke the matched handler, render
//! - Translate failures, or hand them back to the caller for internal
//!   requests
//!
//! # Design Decisions
//! - Immutable after `build()`; route tables are shared via `Arc` so clones
//!   are cheap and lock-free
//! - Settings (vendor, defaults, formats, override handler) are per-clone
//!   and may be replaced without touching the route tables
//! - Versions match exactly; an unknown requested version resolves to the
//!   default
//! - Plain routes never see version negotiation

use std::sync::Arc;
use std::time::Instant;

use axum::http::{header, Method};
use serde_json::Value;

use crate::config::schema::ApiConfig;
use crate::exception::failure::{ApiFailure, HttpFailure};
use crate::exception::handler::ExceptionHandler;
use crate::exception::translator::ExceptionTranslator;
use crate::http::request::{ApiRequest, ApiRequestExt, InternalRequestBuilder};
use crate::http::response::{ApiResponse, Formats, HttpResponse, JsonFormat, ResponseFormat};
use crate::observability::metrics;
use crate::routing::collection::{RouteCollection, RouteCollectionRegistry};
use crate::routing::group::{GroupAttributes, GroupContext, GroupOptions, RouteGroup};
use crate::routing::media_type::{Accept, MediaTypeParser};
use crate::routing::resolver::{NegotiatedRequestContext, VersionResolver};
use crate::routing::route::Action;
use crate::routing::types::{RouterError, RouterResult};
use crate::routing::version::VersionId;

/// Negotiation defaults, response formats and the exception translator.
#[derive(Debug, Clone)]
pub struct RouterSettings {
    vendor: String,
    default_version: String,
    default_format: String,
    default_prefix: Option<String>,
    default_domain: Option<String>,
    formats: Formats,
    translator: ExceptionTranslator,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            vendor: "api".to_string(),
            default_version: "v1".to_string(),
            default_format: "json".to_string(),
            default_prefix: None,
            default_domain: None,
            formats: Formats::default(),
            translator: ExceptionTranslator::default(),
        }
    }
}

impl RouterSettings {
    /// Settings taken from the `[api]` config section.
    pub fn from_config(config: &ApiConfig) -> Self {
        let mut settings = Self::default();
        settings.apply(config);
        settings
    }

    /// Overwrite negotiation settings from config. Registered formats other
    /// than JSON and the exception handler are kept.
    pub fn apply(&mut self, config: &ApiConfig) {
        self.vendor = config.vendor.clone();
        self.default_version = config.default_version.clone();
        self.default_format = config.default_format.clone();
        self.default_prefix = config.default_prefix.clone();
        self.default_domain = config.default_domain.clone();

        let json = if config.pretty_json {
            JsonFormat::pretty()
        } else {
            JsonFormat::new()
        };
        self.formats.register("json", Arc::new(json));
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn set_vendor(&mut self, vendor: impl Into<String>) -> &mut Self {
        self.vendor = vendor.into();
        self
    }

    pub fn default_version(&self) -> &str {
        &self.default_version
    }

    pub fn set_default_version(&mut self, version: impl Into<String>) -> &mut Self {
        self.default_version = version.into();
        self
    }

    pub fn default_format(&self) -> &str {
        &self.default_format
    }

    pub fn set_default_format(&mut self, format: impl Into<String>) -> &mut Self {
        self.default_format = format.into();
        self
    }

    pub fn default_prefix(&self) -> Option<&str> {
        self.default_prefix.as_deref()
    }

    pub fn set_default_prefix(&mut self, prefix: Option<String>) -> &mut Self {
        self.default_prefix = prefix;
        self
    }

    pub fn default_domain(&self) -> Option<&str> {
        self.default_domain.as_deref()
    }

    pub fn set_default_domain(&mut self, domain: Option<String>) -> &mut Self {
        self.default_domain = domain;
        self
    }

    pub fn formats(&self) -> &Formats {
        &self.formats
    }

    pub fn formats_mut(&mut self) -> &mut Formats {
        &mut self.formats
    }

    pub fn exception_handler(&self) -> Option<&Arc<dyn ExceptionHandler>> {
        self.translator.handler()
    }

    pub fn set_exception_handler(&mut self, handler: Option<Arc<dyn ExceptionHandler>>) -> &mut Self {
        self.translator.set_handler(handler);
        self
    }

    pub fn translator(&self) -> &ExceptionTranslator {
        &self.translator
    }

    fn resolver(&self) -> VersionResolver<'_> {
        VersionResolver {
            vendor: &self.vendor,
            default_version: &self.default_version,
            default_format: &self.default_format,
        }
    }

    /// Formatter for a negotiated format name, falling back to the default
    /// format and finally to compact JSON.
    fn format(&self, name: &str) -> Arc<dyn ResponseFormat> {
        self.formats
            .get(name)
            .or_else(|| self.formats.get(&self.default_format))
            .cloned()
            .unwrap_or_else(|| Arc::new(JsonFormat::new()))
    }
}

/// Registration phase of a [`Router`].
#[derive(Debug, Default)]
pub struct RouterBuilder {
    settings: RouterSettings,
    registry: RouteCollectionRegistry,
    plain: RouteCollection,
    error: Option<RouterError>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: RouterSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut RouterSettings {
        &mut self.settings
    }

    /// Register a versioned API group.
    ///
    /// Every route registered in `register` is added to the collection of
    /// each listed version. Groups without their own prefix or domain take
    /// the router defaults. The first registration error is returned here
    /// and again from [`RouterBuilder::build`].
    pub fn api<F>(&mut self, options: GroupOptions, register: F) -> RouterResult<()>
    where
        F: FnOnce(&mut RouteGroup<'_>),
    {
        let versions = match options.normalized_versions() {
            Ok(versions) => versions,
            Err(e) => return Err(self.record(e)),
        };

        let context = GroupContext {
            prefix: options
                .prefix
                .clone()
                .or_else(|| self.settings.default_prefix.clone()),
            domain: options
                .domain
                .clone()
                .or_else(|| self.settings.default_domain.clone()),
            protected: options.protected,
            scopes: options.scopes.clone(),
        };

        let mut error = None;
        register(&mut RouteGroup::api(&mut self.registry, &versions, context, &mut error));

        match error {
            Some(e) => Err(self.record(e)),
            None => {
                tracing::debug!(versions = ?versions, "Registered API group");
                Ok(())
            }
        }
    }

    /// Register plain routes sharing group attributes.
    pub fn group<F>(&mut self, attrs: GroupAttributes, register: F) -> &mut Self
    where
        F: FnOnce(&mut RouteGroup<'_>),
    {
        let context = GroupContext {
            prefix: attrs.prefix,
            domain: attrs.domain,
            protected: attrs.protected.unwrap_or(false),
            scopes: attrs.scopes,
        };
        register(&mut RouteGroup::plain(&mut self.plain, context, &mut self.error));
        self
    }

    pub fn get(&mut self, uri: &str, action: impl Into<Action>) -> &mut Self {
        self.plain_route(&[Method::GET], uri, action.into())
    }

    pub fn post(&mut self, uri: &str, action: impl Into<Action>) -> &mut Self {
        self.plain_route(&[Method::POST], uri, action.into())
    }

    pub fn put(&mut self, uri: &str, action: impl Into<Action>) -> &mut Self {
        self.plain_route(&[Method::PUT], uri, action.into())
    }

    pub fn patch(&mut self, uri: &str, action: impl Into<Action>) -> &mut Self {
        self.plain_route(&[Method::PATCH], uri, action.into())
    }

    pub fn delete(&mut self, uri: &str, action: impl Into<Action>) -> &mut Self {
        self.plain_route(&[Method::DELETE], uri, action.into())
    }

    pub fn any(&mut self, uri: &str, action: impl Into<Action>) -> &mut Self {
        self.plain_route(&[], uri, action.into())
    }

    pub fn matches(&mut self, methods: &[Method], uri: &str, action: impl Into<Action>) -> &mut Self {
        self.plain_route(methods, uri, action.into())
    }

    fn plain_route(&mut self, methods: &[Method], uri: &str, action: Action) -> &mut Self {
        RouteGroup::plain(&mut self.plain, GroupContext::default(), &mut self.error)
            .matches(methods, uri, action);
        self
    }

    fn record(&mut self, error: RouterError) -> RouterError {
        tracing::warn!(error = %error, "API group registration failed");
        self.error.get_or_insert_with(|| error.clone());
        error
    }

    /// Freeze the route tables.
    pub fn build(self) -> RouterResult<Router> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if !self.settings.formats.contains(&self.settings.default_format) {
            return Err(RouterError::UnknownFormat(self.settings.default_format.clone()));
        }

        let default_registered = VersionId::parse(&self.settings.default_version)
            .map(|v| self.registry.has(&v))
            .unwrap_or(false);
        if !self.registry.is_empty() && !default_registered {
            tracing::warn!(
                default_version = %self.settings.default_version,
                "Default version has no API routes; requests falling back to it will fail"
            );
        }

        tracing::info!(
            versions = self.registry.versions().len(),
            plain_routes = self.plain.len(),
            vendor = %self.settings.vendor,
            "Router built"
        );

        Ok(Router {
            settings: self.settings,
            tables: Arc::new(RouteTables {
                registry: self.registry,
                plain: self.plain,
            }),
        })
    }
}

#[derive(Debug)]
struct RouteTables {
    registry: RouteCollectionRegistry,
    plain: RouteCollection,
}

/// Immutable, cheaply cloneable request router.
#[derive(Debug, Clone)]
pub struct Router {
    settings: RouterSettings,
    tables: Arc<RouteTables>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut RouterSettings {
        &mut self.settings
    }

    /// The route collection for a version.
    pub fn api_collection(&self, version: &str) -> RouterResult<&RouteCollection> {
        let version = VersionId::parse(version)?;
        self.tables.registry.lookup(&version)
    }

    pub fn has_api_collection(&self, version: &str) -> bool {
        VersionId::parse(version)
            .map(|v| self.tables.registry.has(&v))
            .unwrap_or(false)
    }

    pub fn api_collections(&self) -> &RouteCollectionRegistry {
        &self.tables.registry
    }

    pub fn plain_routes(&self) -> &RouteCollection {
        &self.tables.plain
    }

    /// Registered API versions, sorted.
    pub fn versions(&self) -> Vec<&VersionId> {
        self.tables.registry.versions()
    }

    /// Parse the request's Accept header against the configured vendor.
    pub fn parse_accept(&self, req: &ApiRequest) -> Option<Accept> {
        let header = req
            .headers()
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok());
        MediaTypeParser::new(self.settings.vendor.as_str()).parse(header)
    }

    /// Whether a request is handled as an API request.
    ///
    /// A request matching only API routes (in any version) or only plain
    /// routes goes there. When both or neither match, a vendor Accept header
    /// tips it to the API.
    pub fn targets_api(&self, req: &ApiRequest) -> bool {
        if self.tables.registry.is_empty() {
            return false;
        }
        let plain = self.tables.plain.find(req).is_some();
        let api = self
            .tables
            .registry
            .iter()
            .any(|(_, collection)| collection.find(req).is_some());

        if api != plain {
            api
        } else {
            self.parse_accept(req).is_some()
        }
    }

    /// Response for a failure, honoring the override handler.
    pub fn handle_exception(&self, failure: &ApiFailure) -> ApiResponse {
        self.settings.translator.handle(failure)
    }

    /// Builder for an in-process request using this router's vendor.
    pub fn internal_request(&self, method: Method, uri: impl Into<String>) -> InternalRequestBuilder {
        InternalRequestBuilder::new(self.settings.vendor.as_str(), method, uri)
            .format(self.settings.default_format.as_str())
    }

    /// Dispatch a request.
    ///
    /// External requests always yield a response; failures are translated.
    /// Internal requests return the failure instead, unless the override
    /// handler claims it.
    pub fn dispatch(&self, req: ApiRequest) -> Result<HttpResponse, ApiFailure> {
        let start = Instant::now();
        if self.targets_api(&req) {
            self.dispatch_api(req, start)
        } else {
            self.dispatch_plain(req, start)
        }
    }

    fn dispatch_api(&self, mut req: ApiRequest, start: Instant) -> Result<HttpResponse, ApiFailure> {
        let internal = req.is_internal();
        let accept = self.parse_accept(&req);

        let negotiated = self.settings.resolver().resolve(
            accept.as_ref(),
            &self.tables.registry,
            &self.settings.formats,
            internal,
        );

        let (format, version, result) = match negotiated {
            Ok(ctx) => {
                let format = ctx.format.clone();
                let version = ctx.version.to_string();
                (format, version, self.invoke_api(&mut req, ctx))
            }
            Err(e) => (
                self.settings.default_format.clone(),
                self.settings.default_version.clone(),
                Err(ApiFailure::from(e)),
            ),
        };

        let response = match result {
            Ok(value) => ApiResponse::value(value),
            Err(failure) => self.recover(failure, internal)?,
        };

        let rendered = response.render(&*self.settings.format(&format));
        metrics::record_dispatch("api", &version, rendered.status().as_u16(), start);
        Ok(rendered)
    }

    fn invoke_api(&self, req: &mut ApiRequest, ctx: NegotiatedRequestContext) -> Result<Value, ApiFailure> {
        let collection = self.tables.registry.lookup(&ctx.version)?;
        let (route, params) = collection.find(req).ok_or_else(HttpFailure::not_found)?;

        tracing::debug!(
            method = %req.method(),
            uri = %route.uri(),
            version = %ctx.version,
            format = %ctx.format,
            internal = ctx.internal,
            "Matched API route"
        );

        req.extensions_mut().insert(params);
        req.extensions_mut().insert(ctx);
        route.handler().call(req)
    }

    fn dispatch_plain(&self, mut req: ApiRequest, start: Instant) -> Result<HttpResponse, ApiFailure> {
        let internal = req.is_internal();

        let result = match self.tables.plain.find(&req) {
            Some((route, params)) => {
                tracing::debug!(method = %req.method(), uri = %route.uri(), "Matched plain route");
                req.extensions_mut().insert(params);
                route.handler().call(&req)
            }
            None => Err(HttpFailure::not_found().into()),
        };

        let response = match result {
            Ok(value) => ApiResponse::value(value),
            Err(failure) if internal => {
                metrics::record_failure(failure.kind(), "propagated");
                return Err(failure);
            }
            Err(failure) => {
                metrics::record_failure(failure.kind(), "translated");
                ExceptionTranslator::respond(&failure)
            }
        };

        let rendered = response.render_plain();
        metrics::record_dispatch("plain", "none", rendered.status().as_u16(), start);
        Ok(rendered)
    }

    fn recover(&self, failure: ApiFailure, internal: bool) -> Result<ApiResponse, ApiFailure> {
        match self.settings.translator.claiming_handler(&failure) {
            Some(handler) => {
                metrics::record_failure(failure.kind(), "overridden");
                Ok(handler.handle(&failure))
            }
            None if internal => {
                tracing::debug!(kind = ?failure.kind(), "Propagating failure to internal caller");
                metrics::record_failure(failure.kind(), "propagated");
                Err(failure)
            }
            None => {
                metrics::record_failure(failure.kind(), "translated");
                Ok(ExceptionTranslator::respond(&failure))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::route::Handler;
    use axum::http::{Request, StatusCode};
    use bytes::Bytes;
    use serde_json::json;

    fn ok(body: &'static str) -> Handler {
        Handler::new(move |_| Ok(json!(body)))
    }

    fn get(uri: &str, accept: Option<&str>) -> ApiRequest {
        let mut builder = Request::get(uri);
        if let Some(accept) = accept {
            builder = builder.header(header::ACCEPT, accept);
        }
        builder.body(Bytes::new()).unwrap()
    }

    fn body(response: &HttpResponse) -> &str {
        std::str::from_utf8(response.body()).unwrap()
    }

    fn router() -> Router {
        let mut builder = RouterBuilder::new();
        builder.settings_mut().set_vendor("testing");
        builder
            .api(GroupOptions::new().version("v1"), |api| {
                api.get("foo", ok("foo"));
            })
            .unwrap();
        builder
            .api(GroupOptions::new().version("v2"), |api| {
                api.get("foo", ok("bar"));
            })
            .unwrap();
        builder.get("plain", ok("plain"));
        builder.build().unwrap()
    }

    #[test]
    fn test_settings_from_config() {
        let config = ApiConfig {
            vendor: "acme".into(),
            default_version: "v3".into(),
            default_prefix: Some("api".into()),
            ..ApiConfig::default()
        };
        let settings = RouterSettings::from_config(&config);
        assert_eq!(settings.vendor(), "acme");
        assert_eq!(settings.default_version(), "v3");
        assert_eq!(settings.default_prefix(), Some("api"));
        assert!(settings.formats().contains("json"));
    }

    #[test]
    fn test_api_requires_version() {
        let mut builder = RouterBuilder::new();
        let err = builder.api(GroupOptions::new(), |_| {}).unwrap_err();
        assert_eq!(err, RouterError::MissingVersion);
        assert_eq!(builder.build().unwrap_err(), RouterError::MissingVersion);
    }

    #[test]
    fn test_build_rejects_unknown_default_format() {
        let mut builder = RouterBuilder::new();
        builder.settings_mut().set_default_format("xml");
        assert_eq!(builder.build().unwrap_err(), RouterError::UnknownFormat("xml".into()));
    }

    #[test]
    fn test_default_prefix_applies_to_groups_without_one() {
        let mut builder = RouterBuilder::new();
        builder.settings_mut().set_default_prefix(Some("api".into()));
        builder
            .api(GroupOptions::new().version("v1"), |api| {
                api.get("foo", ok("foo"));
            })
            .unwrap();
        builder
            .api(GroupOptions::new().version("v2").prefix("other"), |api| {
                api.get("foo", ok("foo"));
            })
            .unwrap();
        let router = builder.build().unwrap();

        assert_eq!(router.api_collection("v1").unwrap().routes()[0].uri(), "api/foo");
        assert_eq!(router.api_collection("v2").unwrap().routes()[0].uri(), "other/foo");
    }

    #[test]
    fn test_version_selection() {
        let router = router();

        let v2 = router
            .dispatch(get("/foo", Some("application/vnd.testing.v2+json")))
            .unwrap();
        assert_eq!(body(&v2), r#"{"message":"bar"}"#);

        let fallback = router.dispatch(get("/foo", None)).unwrap();
        assert_eq!(body(&fallback), r#"{"message":"foo"}"#);
    }

    #[test]
    fn test_targets_api() {
        let router = router();
        assert!(router.targets_api(&get("/foo", None)));
        assert!(!router.targets_api(&get("/plain", None)));
        assert!(!router.targets_api(&get("/nowhere", None)));
        assert!(router.targets_api(&get("/nowhere", Some("application/vnd.testing.v1+json"))));
    }

    #[test]
    fn test_plain_route_ignores_versions() {
        let router = router();
        let response = router
            .dispatch(get("/plain", Some("application/vnd.testing.v2+json")))
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(&response), "plain");
    }

    #[test]
    fn test_unmatched_plain_request_is_plain_404() {
        let response = router().dispatch(get("/nowhere", None)).unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(&response), "404 Not Found");
    }

    #[test]
    fn test_vendor_header_without_api_groups_is_plain_404() {
        let mut builder = RouterBuilder::new();
        builder.settings_mut().set_vendor("testing");
        builder.get("plain", ok("plain"));
        let router = builder.build().unwrap();

        let req = get("/nowhere", Some("application/vnd.testing.v1+json"));
        assert!(!router.targets_api(&req));
        let response = router.dispatch(req).unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(&response), "404 Not Found");
    }

    #[test]
    fn test_internal_request_propagates_failures() {
        let router = router();
        let req = router
            .internal_request(Method::GET, "missing")
            .version(VersionId::parse("v1").unwrap())
            .build()
            .unwrap();

        let failure = router.dispatch(req).unwrap_err();
        assert_eq!(failure.as_http().map(|f| f.status), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_api_collection_lookup() {
        let router = router();
        assert!(router.has_api_collection("v1"));
        assert!(!router.has_api_collection("v3"));
        assert!(matches!(
            router.api_collection("v3"),
            Err(RouterError::UnknownVersion(_))
        ));
        assert_eq!(router.versions().len(), 2);
    }
}
