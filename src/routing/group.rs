//! Route grouping.
//!
//! # Responsibilities
//! - Normalize group options (version list, prefix, domain, protection,
//!   scopes)
//! - Hand a [`RouteGroup`] to the registration callback so every route
//!   registered inside inherits the group context
//! - Merge group context with handler declarations into each route's
//!   [`RouteAction`]
//!
//! # Design Decisions
//! - Group context is an explicit value carried by the `RouteGroup`, never
//!   ambient state
//! - Scopes concatenate: group, then controller, then method; duplicates kept
//! - An explicit handler protection flag beats the group default
//! - Registration errors are recorded and reported once the callback returns

use std::sync::Arc;

use axum::http::Method;

use crate::routing::collection::{RouteCollection, RouteCollectionRegistry};
use crate::routing::matcher::join_paths;
use crate::routing::route::{Action, Route, RouteAction};
use crate::routing::types::{RouterError, RouterResult};
use crate::routing::version::VersionId;

/// Options for an API group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupOptions {
    pub versions: Vec<String>,
    pub prefix: Option<String>,
    pub domain: Option<String>,
    pub protected: bool,
    pub scopes: Vec<String>,
}

impl GroupOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.versions.push(version.into());
        self
    }

    pub fn versions<I, S>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.versions.extend(versions.into_iter().map(Into::into));
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn protected(mut self, protected: bool) -> Self {
        self.protected = protected;
        self
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.push(scope.into());
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

    /// Validate the version list and drop repeats, keeping first-seen order.
    pub fn normalized_versions(&self) -> RouterResult<Vec<VersionId>> {
        if self.versions.is_empty() {
            return Err(RouterError::MissingVersion);
        }

        let mut versions: Vec<VersionId> = Vec::with_capacity(self.versions.len());
        for raw in &self.versions {
            let id = VersionId::parse(raw)?;
            if !versions.contains(&id) {
                versions.push(id);
            }
        }
        Ok(versions)
    }
}

/// Attributes for a nested or plain group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupAttributes {
    pub prefix: Option<String>,
    pub domain: Option<String>,
    pub protected: Option<bool>,
    pub scopes: Vec<String>,
}

impl GroupAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn protected(mut self, protected: bool) -> Self {
        self.protected = Some(protected);
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

/// Merged options in effect for routes registered inside a group.
#[derive(Debug, Clone, Default)]
pub(crate) struct GroupContext {
    pub prefix: Option<String>,
    pub domain: Option<String>,
    pub protected: bool,
    pub scopes: Vec<String>,
}

impl GroupContext {
    fn nest(&self, attrs: &GroupAttributes) -> Self {
        let prefix = match (&self.prefix, &attrs.prefix) {
            (Some(outer), Some(inner)) => Some(join_paths(Some(outer), inner)),
            (outer, inner) => inner.clone().or_else(|| outer.clone()),
        };

        let mut scopes = self.scopes.clone();
        scopes.extend(attrs.scopes.iter().cloned());

        Self {
            prefix,
            domain: attrs.domain.clone().or_else(|| self.domain.clone()),
            protected: attrs.protected.unwrap_or(self.protected),
            scopes,
        }
    }
}

enum Target<'a> {
    Plain(&'a mut RouteCollection),
    Api {
        registry: &'a mut RouteCollectionRegistry,
        versions: &'a [VersionId],
    },
}

/// Registration scope handed to group callbacks.
pub struct RouteGroup<'a> {
    target: Target<'a>,
    context: GroupContext,
    error: &'a mut Option<RouterError>,
}

impl<'a> RouteGroup<'a> {
    pub(crate) fn plain(
        collection: &'a mut RouteCollection,
        context: GroupContext,
        error: &'a mut Option<RouterError>,
    ) -> Self {
        Self {
            target: Target::Plain(collection),
            context,
            error,
        }
    }

    pub(crate) fn api(
        registry: &'a mut RouteCollectionRegistry,
        versions: &'a [VersionId],
        context: GroupContext,
        error: &'a mut Option<RouterError>,
    ) -> Self {
        Self {
            target: Target::Api { registry, versions },
            context,
            error,
        }
    }

    /// Versions routes in this group are registered under; empty for plain groups.
    pub fn versions(&self) -> &[VersionId] {
        match &self.target {
            Target::Plain(_) => &[],
            Target::Api { versions, .. } => *versions,
        }
    }

    /// Register routes in a nested group inheriting this group's context.
    pub fn group<F>(&mut self, attrs: GroupAttributes, register: F) -> &mut Self
    where
        F: FnOnce(&mut RouteGroup<'_>),
    {
        let context = self.context.nest(&attrs);
        let target = match &mut self.target {
            Target::Plain(collection) => Target::Plain(&mut **collection),
            Target::Api { registry, versions } => Target::Api {
                registry: &mut **registry,
                versions: *versions,
            },
        };

        let mut nested = RouteGroup {
            target,
            context,
            error: &mut *self.error,
        };
        register(&mut nested);
        self
    }

    pub fn get(&mut self, uri: &str, action: impl Into<Action>) -> &mut Self {
        self.route(vec![Method::GET], uri, action)
    }

    pub fn post(&mut self, uri: &str, action: impl Into<Action>) -> &mut Self {
        self.route(vec![Method::POST], uri, action)
    }

    pub fn put(&mut self, uri: &str, action: impl Into<Action>) -> &mut Self {
        self.route(vec![Method::PUT], uri, action)
    }

    pub fn patch(&mut self, uri: &str, action: impl Into<Action>) -> &mut Self {
        self.route(vec![Method::PATCH], uri, action)
    }

    pub fn delete(&mut self, uri: &str, action: impl Into<Action>) -> &mut Self {
        self.route(vec![Method::DELETE], uri, action)
    }

    pub fn options(&mut self, uri: &str, action: impl Into<Action>) -> &mut Self {
        self.route(vec![Method::OPTIONS], uri, action)
    }

    /// Register for every method.
    pub fn any(&mut self, uri: &str, action: impl Into<Action>) -> &mut Self {
        self.route(Vec::new(), uri, action)
    }

    pub fn matches(&mut self, methods: &[Method], uri: &str, action: impl Into<Action>) -> &mut Self {
        self.route(methods.to_vec(), uri, action)
    }

    fn route(&mut self, methods: Vec<Method>, uri: &str, action: impl Into<Action>) -> &mut Self {
        let resolved = match action.into().resolve() {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!(uri = %uri, error = %e, "Route registration failed");
                self.error.get_or_insert(e);
                return self;
            }
        };

        let uri = join_paths(self.context.prefix.as_deref(), uri);

        let mut scopes = self.context.scopes.clone();
        scopes.extend(resolved.scopes);

        let action = Arc::new(RouteAction {
            protected: resolved.protected.unwrap_or(self.context.protected),
            scopes,
            domain: self.context.domain.clone(),
            prefix: self.context.prefix.clone(),
            versions: self.versions().to_vec(),
            uses: resolved.uses,
        });

        match &mut self.target {
            Target::Plain(collection) => {
                tracing::debug!(uri = %uri, "Registered plain route");
                collection.push(Route::new(methods, &uri, action, resolved.handler));
            }
            Target::Api { registry, versions } => {
                tracing::debug!(uri = %uri, versions = ?versions, "Registered API route");
                for version in versions.iter() {
                    let route = Route::new(methods.clone(), &uri, Arc::clone(&action), resolved.handler.clone());
                    registry.register(version.clone(), route);
                }
            }
        }
        self
    }
}
