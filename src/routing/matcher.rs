//! Structural route matching.
//!
//! # Responsibilities
//! - Match the request domain (case-insensitive, port ignored)
//! - Match the request method (`GET` routes also answer `HEAD`)
//! - Match the request path against a segment template and capture params
//!
//! # Design Decisions
//! - Host matching is case-insensitive
//! - Path matching is case-sensitive
//! - Leading/trailing slashes are insignificant
//! - No regex to guarantee O(n) matching

use std::collections::HashMap;
use std::fmt;

use axum::http::Method;

use crate::http::request::ApiRequest;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &ApiRequest) -> bool;
}

/// Matches the request domain.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    expected_host: String,
}

impl HostMatcher {
    /// The host is normalized to lowercase for case-insensitive matching.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            expected_host: host.into().to_lowercase(),
        }
    }

    pub fn host(&self) -> &str {
        &self.expected_host
    }
}

/// Extract the request host, preferring an absolute URI over the Host header.
pub fn request_host(req: &ApiRequest) -> Option<String> {
    if let Some(host) = req.uri().host() {
        return Some(host.to_lowercase());
    }

    req.headers()
        .get("host")
        .and_then(|h| h.to_str().ok())
        .map(|h| h.split(':').next().unwrap_or(h).to_lowercase())
}

impl Matcher for HostMatcher {
    fn matches(&self, req: &ApiRequest) -> bool {
        request_host(req)
            .map(|h| h == self.expected_host)
            .unwrap_or(false)
    }
}

/// Matches one of a set of methods.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    methods: Vec<Method>,
}

impl MethodMatcher {
    /// An empty method list matches any method.
    pub fn new(methods: Vec<Method>) -> Self {
        Self { methods }
    }

    pub fn any() -> Self {
        Self::new(Vec::new())
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, req: &ApiRequest) -> bool {
        if self.methods.is_empty() {
            return true;
        }
        let method = req.method();
        self.methods
            .iter()
            .any(|m| m == method || (*m == Method::GET && *method == Method::HEAD))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Optional(String),
}

/// A compiled path template such as `users/{id}/posts/{post?}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    uri: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(uri: &str) -> Self {
        let segments: Vec<Segment> = split_path(uri)
            .map(|raw| match raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => match name.strip_suffix('?') {
                    Some(name) => Segment::Optional(name.to_string()),
                    None => Segment::Param(name.to_string()),
                },
                None => Segment::Literal(raw.to_string()),
            })
            .collect();

        Self {
            uri: split_path(uri).collect::<Vec<_>>().join("/"),
            segments,
        }
    }

    /// The normalized template without leading or trailing slashes.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Match a request path, returning captured parameters on success.
    pub fn captures(&self, path: &str) -> Option<RouteParams> {
        let mut params = RouteParams::default();
        let mut parts = split_path(path);

        for segment in &self.segments {
            match (segment, parts.next()) {
                (Segment::Literal(expected), Some(actual)) if expected == actual => {}
                (Segment::Param(name), Some(actual)) | (Segment::Optional(name), Some(actual)) => {
                    params.insert(name.clone(), actual.to_string());
                }
                (Segment::Optional(_), None) => {}
                _ => return None,
            }
        }

        if parts.next().is_some() {
            return None;
        }
        Some(params)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.uri)
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Join a group prefix and a route URI into one normalized path.
pub fn join_paths(prefix: Option<&str>, uri: &str) -> String {
    prefix
        .into_iter()
        .flat_map(split_path)
        .chain(split_path(uri))
        .collect::<Vec<_>>()
        .join("/")
}

/// Path parameters captured while matching a route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    params: HashMap<String, String>,
}

impl RouteParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: String, value: String) {
        self.params.insert(name, value);
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}
