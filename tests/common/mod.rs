//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use api_router::config::AppConfig;
use api_router::exception::{ApiFailure, ExceptionHandler, FailureKind};
use api_router::http::{ApiRequest, ApiResponse, HttpResponse, HttpServer};
use api_router::lifecycle::Shutdown;
use api_router::routing::{Router, RouterBuilder};
use axum::http::{header, Request, StatusCode};
use bytes::Bytes;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const VENDOR: &str = "testing";

/// Override handler that records what it is asked about.
#[derive(Default)]
pub struct RecordingHandler {
    claim: bool,
    seen: Mutex<Vec<FailureKind>>,
}

#[allow(dead_code)]
impl RecordingHandler {
    /// Declines every failure.
    pub fn declining() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claims every failure and answers `404 testing`.
    pub fn claiming() -> Arc<Self> {
        Arc::new(Self {
            claim: true,
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn seen(&self) -> Vec<FailureKind> {
        self.seen.lock().unwrap().clone()
    }
}

impl ExceptionHandler for RecordingHandler {
    fn will_handle(&self, failure: &ApiFailure) -> bool {
        self.seen.lock().unwrap().push(failure.kind());
        self.claim
    }

    fn handle(&self, _failure: &ApiFailure) -> ApiResponse {
        ApiResponse::raw("testing", StatusCode::NOT_FOUND)
    }
}

/// Builder with vendor `testing` and default version `v1`.
pub fn builder() -> RouterBuilder {
    let mut builder = RouterBuilder::new();
    builder.settings_mut().set_vendor(VENDOR).set_default_version("v1");
    builder
}

/// Build a router, registering routes with `register`.
#[allow(dead_code)]
pub fn router_with(register: impl FnOnce(&mut RouterBuilder)) -> Router {
    let mut builder = builder();
    register(&mut builder);
    builder.build().unwrap()
}

/// A GET request with an optional vendor version.
#[allow(dead_code)]
pub fn get(uri: &str, version: Option<&str>) -> ApiRequest {
    let mut builder = Request::get(uri);
    if let Some(version) = version {
        builder = builder.header(header::ACCEPT, format!("application/vnd.{VENDOR}.{version}+json"));
    }
    builder.body(Bytes::new()).unwrap()
}

#[allow(dead_code)]
pub fn body(response: &HttpResponse) -> String {
    String::from_utf8(response.body().to_vec()).unwrap()
}

/// A server bound to an ephemeral port.
#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub updates: mpsc::UnboundedSender<Router>,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

#[allow(dead_code)]
impl TestServer {
    pub async fn start(router: Router, config: AppConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let shutdown = Shutdown::new();
        let (updates, rx) = mpsc::unbounded_channel();
        let server = HttpServer::new(router, &config);
        let handle = tokio::spawn(server.run(listener, rx, shutdown.subscribe()));

        Self {
            addr,
            shutdown,
            updates,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}/{}", self.addr, path.trim_start_matches('/'))
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        self.handle.await.unwrap().unwrap();
    }
}
