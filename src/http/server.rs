//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router (`/api` relay, `/healthz`)
//! - Wire up middleware (tracing, request ID, timeout, body limits)
//! - Serve plain TCP or TLS until shutdown
//! - Swap the live upstream state when the config file changes

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::Request,
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use arc_swap::ArcSwap;
use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    map_response_body::MapResponseBodyLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::observability::metrics;
use crate::proxy::{Forwarder, ProxyError};

/// Path prefix relayed upstream.
pub const API_PREFIX: &str = "/api";

/// Everything a relay needs; replaced wholesale on reload.
pub struct GatewayState {
    pub config: GatewayConfig,
    pub forwarder: Forwarder,
}

impl GatewayState {
    pub fn from_config(config: GatewayConfig) -> Result<Self, ProxyError> {
        let forwarder = Forwarder::new(
            &config.upstream,
            &config.timeouts,
            config.security.max_body_size,
        )?;
        Ok(Self { config, forwarder })
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<GatewayState>>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, ProxyError> {
        let gateway = GatewayState::from_config(config.clone())?;
        let state = AppState {
            inner: Arc::new(ArcSwap::from_pointee(gateway)),
        };

        let router = Self::build_router(&config, state.clone());
        Ok(Self { router, config, state })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let max_body = config.security.max_body_size;

        Router::new()
            .route("/healthz", get(health_handler))
            .route(API_PREFIX, any(proxy_handler))
            .route("/api/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(
                // Outermost first.
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id = %request_id(request.headers()),
                        )
                    }))
                    .layer(propagate_request_id_layer())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
                    .layer(MapResponseBodyLayer::new(Body::new))
                    .layer(RequestBodyLimitLayer::new(max_body))
                    .layer(DefaultBodyLimit::max(max_body)),
            )
    }

    /// Run the server on a plain TCP listener until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.base_url(),
            "HTTP server starting"
        );

        spawn_config_reloader(self.state.clone(), config_updates);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server with TLS until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        spawn_config_reloader(self.state.clone(), config_updates);

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            shutdown_handle.graceful_shutdown(Some(Duration::from_secs(10)));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Shared state, for callers that want to swap it themselves.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }
}

/// Apply reloaded configs. Only upstream-facing settings take effect live;
/// listener, body limit and timeout layers keep their startup values.
fn spawn_config_reloader(state: AppState, mut updates: mpsc::UnboundedReceiver<GatewayConfig>) {
    tokio::spawn(async move {
        while let Some(config) = updates.recv().await {
            match GatewayState::from_config(config) {
                Ok(next) => {
                    tracing::info!(upstream = %next.forwarder.base_url(), "Configuration reloaded");
                    state.inner.store(Arc::new(next));
                }
                Err(e) => {
                    tracing::error!(error = %e, "Rejected reloaded configuration");
                }
            }
        }
    });
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Relay handler for everything under `/api`.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id(request.headers());
    let method = request.method().clone();
    let path = request
        .uri()
        .path()
        .strip_prefix(API_PREFIX)
        .unwrap_or_default()
        .to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Proxying request"
    );

    let gateway = state.inner.load_full();
    match gateway.forwarder.forward(request, &path).await {
        Ok(upstream) => {
            metrics::record_request(method.as_str(), upstream.status.as_u16(), start);
            tracing::debug!(
                request_id = %request_id,
                status = %upstream.status,
                bytes = upstream.body.len(),
                "Upstream responded"
            );
            upstream.into_response()
        }
        Err(e) => {
            let status = e.status();
            match &e {
                ProxyError::Timeout => metrics::record_upstream_error("timeout"),
                ProxyError::Upstream(_) => metrics::record_upstream_error("transport"),
                _ => {}
            }
            metrics::record_request(method.as_str(), status.as_u16(), start);
            tracing::error!(request_id = %request_id, path = %path, error = %e, "Relay failed");
            e.into_response()
        }
    }
}
