use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::{ApiError, Result};
use crate::models::content::ContentRequest;
use crate::models::job::{JobStatusResponse, SubmitJobResponse};

pub const IDEMPOTENCY_KEY: &str = "idempotency-key";

#[derive(Debug, Deserialize)]
pub struct SubmitParams {
    pub provider: Option<String>,
}

/// POST /v1/jobs: accept a content job and return immediately.
pub async fn submit_job(
    State(state): State<AppState>,
    Query(params): Query<SubmitParams>,
    headers: HeaderMap,
    body: std::result::Result<Json<ContentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitJobResponse>)> {
    let Json(request) = body?;
    let job_id = idempotency_key(&headers)?;

    let job = state
        .gateway
        .submit(request, params.provider.as_deref(), job_id)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitJobResponse {
            job_id: job.id,
            status: job.status,
            created_at: job.created_at,
        }),
    ))
}

/// GET /v1/jobs/{job_id}: current snapshot of a job.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>> {
    let id = Uuid::parse_str(&job_id).map_err(|_| ApiError::InvalidJobId(job_id))?;
    let job = state.gateway.get_status(id).await?;
    Ok(Json(job.into()))
}

fn idempotency_key(headers: &HeaderMap) -> Result<Option<Uuid>> {
    let Some(value) = headers.get(IDEMPOTENCY_KEY) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .map(Some)
        .ok_or_else(|| ApiError::Validation("Idempotency-Key must be a UUID".to_string()))
}
