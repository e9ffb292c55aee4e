//! API server setup and configuration.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::Request;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::api::routes;
use crate::config::{DEFAULT_LISTEN_ADDR, StreamTarget, normalize_listen_addr};
use crate::error::{Error, Result};
use crate::metrics::{MetricsCollector, PrometheusExporter};

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Listen address, `host:port` or `:port`.
    pub listen_addr: String,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
        }
    }
}

impl ApiServerConfig {
    /// Parse the listen address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        normalize_listen_addr(&self.listen_addr)
            .parse()
            .map_err(|e| {
                Error::config(format!(
                    "Invalid listen address '{}': {}",
                    self.listen_addr, e
                ))
            })
    }
}

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub collector: Arc<MetricsCollector>,
    pub exporter: Arc<PrometheusExporter>,
    /// Monitored streams, in configuration order.
    pub streams: Arc<Vec<Arc<StreamTarget>>>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(collector: Arc<MetricsCollector>, streams: Vec<Arc<StreamTarget>>) -> Self {
        Self {
            exporter: Arc::new(PrometheusExporter::new(collector.clone())),
            collector,
            streams: Arc::new(streams),
            start_time: Instant::now(),
        }
    }
}

/// API server.
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Build the router with all middleware and routes.
    pub fn build_router(&self) -> Router {
        routes::create_router(self.state.clone()).layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request| {
                    // Scrapes and health checks are too frequent to trace.
                    if is_quiet_path(req.uri().path()) {
                        Span::none()
                    } else {
                        let mut make_span =
                            tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO);
                        use tower_http::trace::MakeSpan;
                        make_span.make_span(req)
                    }
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        if span.is_disabled() {
                            return;
                        }
                        let on_response =
                            tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO);
                        use tower_http::trace::OnResponse;
                        on_response.on_response(res, latency, span);
                    },
                ),
        )
    }

    /// Serve until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let addr = self.config.socket_addr()?;
        let router = self.build_router();
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Metrics endpoint listening on http://{}/metrics", addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
                tracing::info!("API server shutting down...");
            })
            .await
            .map_err(|e| Error::Other(format!("Server error: {}", e)))?;

        Ok(())
    }
}

fn is_quiet_path(path: &str) -> bool {
    path == "/metrics" || path.starts_with("/health")
}
