//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the relay and status handlers
//! - Wire up middleware (CORS, request ID, tracing, limits, timeout)
//! - Bind server to listener (plain TCP or TLS)
//! - Swap in reloaded configuration
//! - Dispatch relay requests: interpret → fetch → translate

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, RawQuery, State},
    http::{HeaderMap, Method, Request},
    response::Response,
    routing::{any, get},
    Json, Router,
};
use axum_server::tls_rustls::RustlsConfig;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::validation::STATUS_PATH;
use crate::config::RelayConfig;
use crate::http::middleware::{allow_any_origin, request_id_layer, request_id_of};
use crate::http::request::{self, Interpreted};
use crate::http::response;
use crate::observability::metrics;
use crate::upstream::{upstream_host, UpstreamFetcher, UpstreamSetupError};

/// Configuration and the client built from it, replaced together on reload.
pub struct RelayState {
    pub config: RelayConfig,
    pub fetcher: UpstreamFetcher,
}

impl RelayState {
    fn build(config: RelayConfig) -> Result<Self, UpstreamSetupError> {
        let fetcher = UpstreamFetcher::from_config(&config.upstream)?;
        Ok(Self { config, fetcher })
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<RelayState>>,
}

/// Liveness payload served on the status path.
#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
}

/// HTTP server for the relay.
pub struct RelayServer {
    router: Router,
    state: AppState,
    config: RelayConfig,
}

impl RelayServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: RelayConfig) -> Result<Self, UpstreamSetupError> {
        let state = AppState {
            inner: Arc::new(ArcSwap::from_pointee(RelayState::build(config.clone())?)),
        };
        let router = Self::build_router(&config, state.clone());

        Ok(Self {
            router,
            state,
            config,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        Router::new()
            .route(&config.relay.path, any(relay_handler))
            .route(STATUS_PATH, get(status_handler))
            .with_state(state)
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(config.relay.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            // One semaphore shared by every route, not one per route.
            .layer(GlobalConcurrencyLimitLayer::new(
                config.listener.max_concurrent_requests,
            ))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        request_id = %request_id_of(request),
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                }),
            )
            .layer(request_id_layer())
            .layer(allow_any_origin())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<RelayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            relay_path = %self.config.relay.path,
            "HTTP server starting"
        );

        spawn_reloader(self.state.clone(), config_updates);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server over TLS on `addr`.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        config_updates: mpsc::UnboundedReceiver<RelayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(
            address = %addr,
            relay_path = %self.config.relay.path,
            "HTTPS server starting"
        );

        spawn_reloader(self.state.clone(), config_updates);

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        let grace = Duration::from_secs(self.config.timeouts.request_secs);
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received");
            shutdown_handle.graceful_shutdown(Some(grace));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    /// Get a reference to the startup config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}

/// Apply configuration updates until the sender side goes away.
fn spawn_reloader(state: AppState, mut updates: mpsc::UnboundedReceiver<RelayConfig>) {
    tokio::spawn(async move {
        while let Some(config) = updates.recv().await {
            apply_config(&state, config);
        }
    });
}

fn apply_config(state: &AppState, config: RelayConfig) {
    let current = state.inner.load();
    if current.config.relay.path != config.relay.path
        || current.config.listener.bind_address != config.listener.bind_address
    {
        tracing::warn!("Listener and route changes take effect after restart");
    }

    match RelayState::build(config) {
        Ok(next) => {
            state.inner.store(Arc::new(next));
            tracing::info!("Configuration reloaded");
        }
        Err(e) => {
            tracing::error!(error = %e, "Rejected reloaded configuration");
        }
    }
}

/// Relay handler: interpret the request, fetch once, translate the outcome.
async fn relay_handler(
    State(state): State<AppState>,
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start_time = Instant::now();

    let response = match request::interpret(&method, query.as_deref(), &headers, &body) {
        Ok(Interpreted::Preflight) => response::preflight(),
        Ok(Interpreted::Fetch(target)) => {
            let inner = state.inner.load_full();
            let host = upstream_host(&target.url);

            tracing::debug!(
                upstream_host = %host,
                encoding = ?target.encoding,
                "Relaying request"
            );

            let outcome = inner
                .fetcher
                .fetch(&target.url, target.user_agent.as_ref())
                .await;
            metrics::record_upstream(outcome.label());
            response::translate(outcome, &host)
        }
        Err(err) => response::rejected(&err),
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start_time);
    response
}

async fn status_handler() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
    })
}
