pub mod content;
pub mod health;
pub mod jobs;
pub mod metrics;
pub mod providers;

use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// JSON bodies only; images are fetched by URL.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Build the HTTP surface. `/metrics` is mounted only when a recorder handle
/// is supplied.
pub fn router(state: AppState, prometheus: Option<Arc<PrometheusHandle>>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health::health_check))
        .route("/v1/jobs", post(jobs::submit_job))
        .route("/v1/jobs/{job_id}", get(jobs::get_job_status))
        .route("/v1/content/generate", post(content::generate_content))
        .route("/v1/providers", get(providers::list_providers))
        .with_state(state);

    if let Some(handle) = prometheus {
        // separate state
        app = app.route(
            "/metrics",
            get(metrics::prometheus_metrics).with_state(handle),
        );
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
}
