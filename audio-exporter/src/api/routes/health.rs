//! Health check routes.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde::Serialize;

use crate::api::server::AppState;
use crate::metrics::StreamMetric;

/// Health of one monitored stream.
#[derive(Debug, Clone, Serialize)]
pub struct StreamHealth {
    pub url: String,
    /// Last probe result; `None` until the first probe completes.
    pub up: Option<bool>,
    pub silent: bool,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub streams: Vec<StreamHealth>,
}

/// Create the health router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness_check))
}

/// Health check endpoint.
///
/// `degraded` when any stream failed its last probe.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = state.start_time.elapsed().as_secs();

    let streams: Vec<StreamHealth> = state
        .streams
        .iter()
        .map(|target| StreamHealth {
            url: target.url.clone(),
            up: state
                .collector
                .gauge(StreamMetric::StreamUp, &target.url)
                .map(|v| v >= 1.0),
            silent: state
                .collector
                .gauge(StreamMetric::SilenceActive, &target.url)
                .is_some_and(|v| v >= 1.0),
        })
        .collect();

    let status = if streams.iter().any(|s| s.up == Some(false)) {
        "degraded"
    } else {
        "healthy"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: uptime,
        streams,
    })
}

/// Liveness check - is the service alive?
async fn liveness_check(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "alive",
            "uptime_secs": uptime
        })),
    )
}
