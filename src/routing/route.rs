//! Routes, handlers and declarative handler metadata.
//!
//! Handlers declare their requirements up front: a bare handler may carry one
//! [`Declaration`], a controller route carries a controller-wide declaration
//! plus an optional per-method one. Everything is resolved once, at
//! registration, into the route's [`RouteAction`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::http::Method;
use serde::Serialize;
use serde_json::Value;

use crate::exception::failure::ApiFailure;
use crate::http::request::ApiRequest;
use crate::routing::matcher::{HostMatcher, Matcher, MethodMatcher, PathTemplate, RouteParams};
use crate::routing::types::{RouterError, RouterResult};
use crate::routing::version::VersionId;

type HandlerFn = dyn Fn(&ApiRequest) -> Result<Value, ApiFailure> + Send + Sync;

/// A shared, synchronous request handler.
#[derive(Clone)]
pub struct Handler(Arc<HandlerFn>);

impl Handler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ApiRequest) -> Result<Value, ApiFailure> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, request: &ApiRequest) -> Result<Value, ApiFailure> {
        (self.0)(request)
    }

    /// Whether two handles point at the same closure.
    pub fn same_as(&self, other: &Handler) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Attach a declaration, turning the handler into a route action.
    pub fn declare(self, declaration: Declaration) -> Action {
        Action::Handler {
            handler: self,
            declaration,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler(..)")
    }
}

/// Shorthand for [`Handler::new`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&ApiRequest) -> Result<Value, ApiFailure> + Send + Sync + 'static,
{
    Handler::new(f)
}

/// Requirements a controller or controller method declares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declaration {
    /// `None` means "inherit".
    pub protected: Option<bool>,
    pub scopes: Vec<String>,
}

impl Declaration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protect(mut self) -> Self {
        self.protected = Some(true);
        self
    }

    pub fn unprotect(mut self) -> Self {
        self.protected = Some(false);
        self
    }

    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes.extend(scopes.into_iter().map(Into::into));
        self
    }
}

#[derive(Debug, Clone)]
struct ControllerMethod {
    handler: Handler,
    declaration: Declaration,
}

/// A named group of handlers sharing declarations.
#[derive(Debug, Clone)]
pub struct Controller {
    name: String,
    declaration: Declaration,
    methods: HashMap<String, ControllerMethod>,
}

impl Controller {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declaration: Declaration::default(),
            methods: HashMap::new(),
        }
    }

    /// Declaration applying to every method of the controller.
    pub fn declare(mut self, declaration: Declaration) -> Self {
        self.declaration = declaration;
        self
    }

    pub fn method(self, name: impl Into<String>, handler: Handler) -> Self {
        self.method_with(name, handler, Declaration::default())
    }

    /// Add a method with its own declaration.
    pub fn method_with(mut self, name: impl Into<String>, handler: Handler, declaration: Declaration) -> Self {
        self.methods
            .insert(name.into(), ControllerMethod { handler, declaration });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reference one method as a route action.
    pub fn action(self: &Arc<Self>, method: impl Into<String>) -> Action {
        Action::Controller {
            controller: Arc::clone(self),
            method: method.into(),
        }
    }
}

/// What a route invokes.
#[derive(Debug, Clone)]
pub enum Action {
    Handler {
        handler: Handler,
        declaration: Declaration,
    },
    Controller {
        controller: Arc<Controller>,
        method: String,
    },
}

impl From<Handler> for Action {
    fn from(handler: Handler) -> Self {
        handler.declare(Declaration::default())
    }
}

/// An action with its declarations flattened.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedAction {
    pub handler: Handler,
    /// Method declaration, else controller declaration.
    pub protected: Option<bool>,
    /// Controller scopes followed by method scopes.
    pub scopes: Vec<String>,
    pub uses: Option<String>,
}

impl Action {
    pub(crate) fn resolve(&self) -> RouterResult<ResolvedAction> {
        match self {
            Action::Handler { handler, declaration } => Ok(ResolvedAction {
                handler: handler.clone(),
                protected: declaration.protected,
                scopes: declaration.scopes.clone(),
                uses: None,
            }),
            Action::Controller { controller, method } => {
                let entry = controller.methods.get(method).ok_or_else(|| {
                    RouterError::UnknownControllerMethod {
                        controller: controller.name.clone(),
                        method: method.clone(),
                    }
                })?;

                let scopes = controller
                    .declaration
                    .scopes
                    .iter()
                    .chain(entry.declaration.scopes.iter())
                    .cloned()
                    .collect();

                Ok(ResolvedAction {
                    handler: entry.handler.clone(),
                    protected: entry.declaration.protected.or(controller.declaration.protected),
                    scopes,
                    uses: Some(format!("{}@{}", controller.name, method)),
                })
            }
        }
    }
}

/// Metadata baked into a route at registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteAction {
    pub protected: bool,
    pub scopes: Vec<String>,
    pub domain: Option<String>,
    pub prefix: Option<String>,
    pub versions: Vec<VersionId>,
    pub uses: Option<String>,
}

/// A registered route.
#[derive(Debug, Clone)]
pub struct Route {
    methods: MethodMatcher,
    template: PathTemplate,
    host: Option<HostMatcher>,
    action: Arc<RouteAction>,
    handler: Handler,
}

impl Route {
    pub(crate) fn new(methods: Vec<Method>, uri: &str, action: Arc<RouteAction>, handler: Handler) -> Self {
        Self {
            methods: MethodMatcher::new(methods),
            template: PathTemplate::parse(uri),
            host: action.domain.as_deref().map(HostMatcher::new),
            action,
            handler,
        }
    }

    pub fn methods(&self) -> &[Method] {
        self.methods.methods()
    }

    /// Normalized URI template, prefix included.
    pub fn uri(&self) -> &str {
        self.template.uri()
    }

    pub fn action(&self) -> &RouteAction {
        &self.action
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Structural match on method, domain and path.
    pub fn matches(&self, req: &ApiRequest) -> Option<RouteParams> {
        if !self.methods.matches(req) {
            return None;
        }
        if let Some(host) = &self.host {
            if !host.matches(req) {
                return None;
            }
        }
        self.template.captures(req.uri().path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok(value: &'static str) -> Handler {
        Handler::new(move |_| Ok(json!(value)))
    }

    #[test]
    fn test_closure_action_has_no_declarations() {
        let resolved = Action::from(ok("bar")).resolve().unwrap();
        assert_eq!(resolved.protected, None);
        assert!(resolved.scopes.is_empty());
        assert!(resolved.uses.is_none());
    }

    #[test]
    fn test_declared_handler() {
        let action = ok("bar").declare(Declaration::new().protect().scopes(["read"]));
        let resolved = action.resolve().unwrap();
        assert_eq!(resolved.protected, Some(true));
        assert_eq!(resolved.scopes, vec!["read"]);
    }

    #[test]
    fn test_controller_scopes_then_method_scopes() {
        let controller = Arc::new(
            Controller::new("UserController")
                .declare(Declaration::new().scopes(["foo"]))
                .method_with("index", ok("users"), Declaration::new().scopes(["bar"])),
        );

        let resolved = controller.action("index").resolve().unwrap();
        assert_eq!(resolved.scopes, vec!["foo", "bar"]);
        assert_eq!(resolved.uses.as_deref(), Some("UserController@index"));
    }

    #[test]
    fn test_method_protection_overrides_controller() {
        let controller = Arc::new(
            Controller::new("PostController")
                .declare(Declaration::new().protect())
                .method_with("index", ok("posts"), Declaration::new().unprotect())
                .method("show", ok("post")),
        );

        assert_eq!(controller.action("index").resolve().unwrap().protected, Some(false));
        assert_eq!(controller.action("show").resolve().unwrap().protected, Some(true));
    }

    #[test]
    fn test_unknown_controller_method() {
        let controller = Arc::new(Controller::new("EmptyController"));
        let err = controller.action("missing").resolve().unwrap_err();
        assert_eq!(
            err,
            RouterError::UnknownControllerMethod {
                controller: "EmptyController".into(),
                method: "missing".into(),
            }
        );
    }

    #[test]
    fn test_route_matching() {
        let action = Arc::new(RouteAction {
            domain: Some("api.example.com".into()),
            ..RouteAction::default()
        });
        let route = Route::new(vec![Method::GET], "users/{id}", action, ok("user"));

        let bare = ApiRequest::new(bytes::Bytes::new());
        assert!(route.matches(&bare).is_none()); // wrong path and no host

        let req = axum::http::Request::get("http://api.example.com/users/7")
            .body(bytes::Bytes::new())
            .unwrap();
        assert_eq!(route.matches(&req).unwrap().get("id"), Some("7"));

        let post = axum::http::Request::post("http://api.example.com/users/7")
            .body(bytes::Bytes::new())
            .unwrap();
        assert!(route.matches(&post).is_none());
    }
}
