use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::error::Result;
use crate::models::content::{ContentRequest, ContentResponse};
use crate::models::provider::ProviderOverrides;
use crate::services::generate;

#[derive(Debug, Deserialize)]
pub struct GenerateParams {
    pub provider: Option<String>,
    pub model: Option<String>,
}

/// POST /v1/content/generate: blocks until the provider answers.
pub async fn generate_content(
    State(state): State<AppState>,
    Query(params): Query<GenerateParams>,
    body: std::result::Result<Json<ContentRequest>, JsonRejection>,
) -> Result<Json<ContentResponse>> {
    let Json(request) = body?;
    let overrides = ProviderOverrides {
        api_key: None,
        model_name: params.model,
    };

    let response = generate::generate_now(
        &state.registry,
        &state.settings,
        &request,
        params.provider.as_deref(),
        &overrides,
    )
    .await?;

    Ok(Json(response))
}
