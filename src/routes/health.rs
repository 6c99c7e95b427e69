use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::app_state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub mock_mode: bool,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthChecks {
    pub broker: ComponentHealth,
    pub store: ComponentHealth,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    pub latency_ms: Option<u64>,
}

impl ComponentHealth {
    fn from_result<E: std::fmt::Display>(component: &str, result: Result<(), E>, start: Instant) -> Self {
        match result {
            Ok(()) => Self {
                status: "ok".to_string(),
                latency_ms: Some(start.elapsed().as_millis() as u64),
            },
            Err(e) => {
                tracing::warn!(component, error = %e, "Health check failed");
                Self {
                    status: "error".to_string(),
                    latency_ms: None,
                }
            }
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// GET /health: broker and result store reachability.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let broker_start = Instant::now();
    let broker_check =
        ComponentHealth::from_result("broker", state.broker.health_check().await, broker_start);

    if broker_check.is_ok() {
        if let Ok(depth) = state.broker.depth().await {
            metrics::gauge!("content_queue_depth").set(depth as f64);
        }
    }

    let store_start = Instant::now();
    let store_check =
        ComponentHealth::from_result("store", state.store.health_check().await, store_start);

    let all_healthy = broker_check.is_ok() && store_check.is_ok();
    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if all_healthy {
            "ok".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        mock_mode: state.settings.mock_mode,
        checks: HealthChecks {
            broker: broker_check,
            store: store_check,
        },
    };

    (status_code, Json(response))
}
