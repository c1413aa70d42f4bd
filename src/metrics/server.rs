//! HTTP server for the Prometheus scrape endpoint.

use super::{exposition, Collector};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::future::Future;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;

/// Path of the liveness probe.
pub const HEALTH_PATH: &str = "/health";

/// Errors that can occur during metrics server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    #[error("server error: {0}")]
    Server(String),
}

/// Configuration for the metrics server.
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    /// Address to bind the server to. The IPv6 wildcard serves both
    /// address families where the host allows it.
    pub bind_addr: SocketAddr,
    /// Path serving the metrics.
    pub path: String,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: (Ipv6Addr::UNSPECIFIED, 8000).into(),
            path: "/metrics".to_string(),
        }
    }
}

impl MetricsServerConfig {
    /// Creates a config with a custom port.
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: (Ipv6Addr::UNSPECIFIED, port).into(),
            ..Default::default()
        }
    }
}

/// HTTP server running one scrape per metrics request.
pub struct MetricsServer {
    config: MetricsServerConfig,
    collector: Arc<Collector>,
}

impl MetricsServer {
    /// Creates a new metrics server.
    pub fn new(config: MetricsServerConfig, collector: Arc<Collector>) -> Self {
        Self { config, collector }
    }

    /// Builds the router without binding a socket.
    pub fn router(&self) -> Router {
        let mut router = Router::new().route(&self.config.path, get(metrics_handler));
        if self.config.path != HEALTH_PATH {
            router = router.route(HEALTH_PATH, get(health_handler));
        }

        router
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(&self.collector))
    }

    /// Starts the HTTP server.
    ///
    /// This method runs the server until it is shut down.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Starts the HTTP server and stops gracefully once `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let listener = bind_listener(self.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!(
            addr = %local_addr,
            path = %self.config.path,
            "Metrics server listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Server(e.to_string()))?;

        Ok(())
    }
}

/// Binds `addr`, falling back to the IPv4 wildcard when the IPv6 wildcard
/// is unavailable on this host.
async fn bind_listener(addr: SocketAddr) -> Result<tokio::net::TcpListener, ServerError> {
    match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => Ok(listener),
        Err(e) if addr.ip() == Ipv6Addr::UNSPECIFIED => {
            tracing::warn!(addr = %addr, error = %e, "IPv6 unavailable, listening on IPv4 only");
            let fallback = SocketAddr::from((Ipv4Addr::UNSPECIFIED, addr.port()));
            Ok(tokio::net::TcpListener::bind(fallback).await?)
        }
        Err(e) => Err(e.into()),
    }
}

/// Handler for the metrics endpoint.
async fn metrics_handler(State(collector): State<Arc<Collector>>) -> impl IntoResponse {
    let samples = collector.collect().await;

    match exposition::render(collector.schema(), &samples) {
        Ok(output) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, exposition::CONTENT_TYPE)],
            output,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}

/// Handler for the /health endpoint.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
