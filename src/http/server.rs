//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum app with a single fallback handler
//! - Wire up middleware (tracing, timeout, body limit, request ID)
//! - Buffer request bodies and hand requests to the [`Router`]
//! - Swap in rebuilt routers without dropping connections
//! - Stop accepting on the shutdown signal

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::schema::AppConfig;
use crate::exception::translator::canonical_message;
use crate::http::request::X_REQUEST_ID;
use crate::routing::router::Router;

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ArcSwap<Router>>,
    pub max_body_bytes: usize,
}

/// HTTP front end for a [`Router`].
pub struct HttpServer {
    app: axum::Router,
    router: Arc<ArcSwap<Router>>,
}

impl HttpServer {
    /// Create a new HTTP server serving `router` with the listener and
    /// timeout settings from `config`.
    pub fn new(router: Router, config: &AppConfig) -> Self {
        let router = Arc::new(ArcSwap::from_pointee(router));
        let state = AppState {
            router: Arc::clone(&router),
            max_body_bytes: config.listener.max_body_bytes,
        };

        let app = Self::build_app(config, state);
        Self { app, router }
    }

    /// Build the Axum app with all middleware layers.
    #[allow(deprecated)]
    fn build_app(config: &AppConfig, state: AppState) -> axum::Router {
        let max_body_bytes = state.max_body_bytes;
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(RequestBodyLimitLayer::new(max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        axum::Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(middleware)
    }

    /// Shared handle to the live router.
    pub fn router(&self) -> Arc<ArcSwap<Router>> {
        Arc::clone(&self.router)
    }

    /// Serve until `shutdown` fires. Routers received on `updates` replace
    /// the live one; in-flight requests finish on the router they started
    /// with.
    pub async fn run(
        self,
        listener: TcpListener,
        mut updates: mpsc::UnboundedReceiver<Router>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let live = Arc::clone(&self.router);
        tokio::spawn(async move {
            while let Some(router) = updates.recv().await {
                tracing::info!(versions = router.versions().len(), "Router reloaded");
                live.store(Arc::new(router));
            }
        });

        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Buffers the body and dispatches through the live router.
async fn dispatch_handler(State(state): State<AppState>, request: Request) -> Response {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Failed to read request body");
            let status = StatusCode::PAYLOAD_TOO_LARGE;
            return (status, canonical_message(status)).into_response();
        }
    };
    let request = axum::http::Request::from_parts(parts, bytes);

    tracing::debug!(
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
        "Dispatching request"
    );

    let router = state.router.load();
    match router.dispatch(request) {
        Ok(response) => response.map(Body::from),
        Err(failure) => {
            tracing::error!(request_id = %request_id, error = %failure, "Dispatch returned a failure for an external request");
            router.handle_exception(&failure).render_plain().map(Body::from)
        }
    }
}
