//! Prometheus scrape endpoint.

use axum::{
    Router,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
};

use crate::api::server::AppState;
use crate::metrics::CONTENT_TYPE;

/// Create the metrics router.
pub fn router() -> Router<AppState> {
    Router::new().route("/metrics", get(get_prometheus_metrics))
}

/// Render every metric family in text exposition format.
async fn get_prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], state.exporter.export())
}
