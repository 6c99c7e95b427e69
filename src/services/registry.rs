//! Name -> constructor registry for content providers.

use parking_lot::RwLock;
use reqwest::Client;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::Settings;
use crate::models::provider::{ProviderConfig, ProviderOverrides};
use crate::services::config_resolver;
use crate::services::providers::gemini::{GeminiProvider, RemoteOptions, GEMINI_PROVIDER_NAME};
use crate::services::providers::mock::{MockProvider, MOCK_PROVIDER_NAME};
use crate::services::providers::ContentProvider;

/// Builds a ready-to-use provider from its resolved configuration.
pub type ProviderConstructor =
    Arc<dyn Fn(ProviderConfig) -> Result<Arc<dyn ContentProvider>, ProviderError> + Send + Sync>;

/// Registry of provider constructors, keyed by lowercase name.
///
/// Lookups take a shared lock only long enough to clone the constructor, so
/// runtime registration never blocks an in-flight construction.
pub struct ProviderRegistry {
    constructors: RwLock<BTreeMap<String, ProviderConstructor>>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            constructors: RwLock::new(BTreeMap::new()),
        }
    }

    /// Registry with the built-in `mock` and `gemini` providers.
    pub fn with_defaults(http: Client, remote: RemoteOptions) -> Self {
        let registry = Self::new();
        registry.register(MOCK_PROVIDER_NAME, |_config| {
            Ok(Arc::new(MockProvider::new()) as Arc<dyn ContentProvider>)
        });
        registry.register(GEMINI_PROVIDER_NAME, move |config| {
            let provider = GeminiProvider::new(http.clone(), config, remote.clone())?;
            Ok(Arc::new(provider) as Arc<dyn ContentProvider>)
        });
        registry
    }

    /// Add or replace a provider.
    pub fn register<F>(&self, name: &str, constructor: F)
    where
        F: Fn(ProviderConfig) -> Result<Arc<dyn ContentProvider>, ProviderError>
            + Send
            + Sync
            + 'static,
    {
        let key = name.to_lowercase();
        tracing::debug!(provider = %key, "Registering content provider");
        self.constructors.write().insert(key, Arc::new(constructor));
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<String> {
        self.constructors.read().keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.read().contains_key(&name.to_lowercase())
    }

    /// Resolve configuration for `provider_name` and construct it.
    ///
    /// With `mock_mode` set the mock provider is returned whatever name was
    /// asked for.
    pub fn get(
        &self,
        provider_name: &str,
        mock_mode: bool,
        settings: &Settings,
        overrides: &ProviderOverrides,
    ) -> Result<Arc<dyn ContentProvider>, ProviderError> {
        if mock_mode {
            tracing::debug!(requested = %provider_name, "Mock mode enabled, using mock provider");
            return Ok(Arc::new(MockProvider::new()) as Arc<dyn ContentProvider>);
        }

        let key = provider_name.to_lowercase();
        let constructor = self.constructors.read().get(&key).cloned();
        let Some(constructor) = constructor else {
            return Err(ProviderError::Unsupported {
                name: provider_name.to_string(),
                available: self.list(),
            });
        };

        let config = config_resolver::resolve(&key, settings, overrides);
        constructor(config.clone()).map_err(|e| {
            tracing::warn!(provider = %key, config = ?config, error = %e, "Provider construction failed");
            ProviderError::Construction {
                provider: key.clone(),
                config: config.redacted(),
                source: Box::new(e),
            }
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Unsupported provider: {name}. Supported providers: {}", .available.join(", "))]
    Unsupported { name: String, available: Vec<String> },

    #[error("Missing credential for provider '{provider}' (set {hint})")]
    MissingCredential { provider: String, hint: String },

    #[error("Failed to construct provider '{provider}' with {config:?}: {source}")]
    Construction {
        provider: String,
        config: ProviderConfig,
        #[source]
        source: Box<ProviderError>,
    },
}

impl ProviderError {
    /// The innermost cause, looking through construction wrappers.
    pub fn root(&self) -> &ProviderError {
        match self {
            ProviderError::Construction { source, .. } => source.root(),
            other => other,
        }
    }
}
