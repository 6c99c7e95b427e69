use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Describe every metric the service records, so scrapes carry help text.
pub fn describe() {
    metrics::describe_counter!(
        "content_jobs_submitted_total",
        "Content jobs accepted by the gateway"
    );
    metrics::describe_counter!(
        "content_jobs_completed_total",
        "Content jobs that finished with a result"
    );
    metrics::describe_counter!(
        "content_jobs_failed_total",
        "Content jobs that finished with an error"
    );
    metrics::describe_counter!(
        "content_sync_generations_total",
        "Successful synchronous generations"
    );
    metrics::describe_histogram!(
        "content_generation_seconds",
        "Time spent inside a content provider"
    );
    metrics::describe_gauge!(
        "content_queue_depth",
        "Jobs waiting in the broker, sampled on health checks"
    );
}

/// Prometheus scrape endpoint, text exposition format.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}
