//! Inline generation: resolve a provider and run it on the caller's task.

use garde::Validate;
use std::time::Instant;

use crate::config::Settings;
use crate::models::content::{ContentRequest, ContentResponse, GenerationMetadata};
use crate::models::provider::ProviderOverrides;
use crate::services::providers::GenerationError;
use crate::services::registry::{ProviderError, ProviderRegistry};

/// Generate content without going through the broker.
///
/// `provider` defaults to the configured default. Latency covers resolution
/// and the provider call.
pub async fn generate_now(
    registry: &ProviderRegistry,
    settings: &Settings,
    request: &ContentRequest,
    provider: Option<&str>,
    overrides: &ProviderOverrides,
) -> Result<ContentResponse, GenerateError> {
    request.validate()?;

    let start = Instant::now();
    let provider_name = provider
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(settings.default_provider.as_str())
        .to_lowercase();

    let strategy = registry.get(&provider_name, settings.mock_mode, settings, overrides)?;
    let (generated_content, model) = strategy.generate_content(request).await.map_err(|e| {
        tracing::error!(provider = %strategy.name(), error = %e, "Synchronous generation failed");
        e
    })?;
    let elapsed = start.elapsed();

    metrics::counter!("content_sync_generations_total", "provider" => strategy.name().to_string())
        .increment(1);
    metrics::histogram!("content_generation_seconds").record(elapsed.as_secs_f64());
    tracing::info!(
        provider = %strategy.name(),
        model = %model,
        latency_ms = elapsed.as_millis() as u64,
        "Generated content synchronously"
    );

    Ok(ContentResponse {
        generated_content,
        ai_model_used: model.clone(),
        latency_ms: elapsed.as_secs_f64() * 1000.0,
        metadata: GenerationMetadata {
            provider: strategy.name().to_string(),
            model,
        },
    })
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Invalid request: {0}")]
    Validation(#[from] garde::Report),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Content generation failed: {0}")]
    Generation(#[from] GenerationError),
}
