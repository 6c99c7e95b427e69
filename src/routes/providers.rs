use axum::extract::State;
use axum::Json;

use crate::app_state::AppState;
use crate::models::provider::{ProviderOverrides, ProviderStatus, ProvidersResponse};
use crate::services::config_resolver;

/// GET /v1/providers: registered providers and whether each is usable.
///
/// Reports only whether a credential resolved, never its value.
pub async fn list_providers(State(state): State<AppState>) -> Json<ProvidersResponse> {
    let available = state.registry.list();
    let providers = available
        .iter()
        .map(|name| {
            let config =
                config_resolver::resolve(name, &state.settings, &ProviderOverrides::default());
            (
                name.clone(),
                ProviderStatus {
                    credential_configured: config.api_key.is_some(),
                    model_name: config.model_name,
                },
            )
        })
        .collect();

    Json(ProvidersResponse {
        default_provider: state.settings.default_provider.clone(),
        mock_mode: state.settings.mock_mode,
        available_providers: available,
        providers,
    })
}
