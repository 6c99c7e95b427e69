use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::services::providers::gemini::RemoteOptions;

/// Process configuration, read once from the environment (and `.env`).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:8000"). Ignored by the worker.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Redis connection string for the broker and result store. When unset,
    /// both live in memory and the API process runs its own workers.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Provider used when a request does not name one
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Route every request to the mock provider, whatever it asks for
    #[serde(default)]
    pub mock_mode: bool,

    /// Worker slots in the standalone worker process
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,

    /// Worker slots inside the API process
    #[serde(default)]
    pub embedded_workers: Option<usize>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound on one provider invocation inside a worker
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,

    #[serde(default = "default_image_fetch_timeout_secs")]
    pub image_fetch_timeout_secs: u64,

    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,

    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,

    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,

    /// How long job snapshots and dedup markers live in Redis
    #[serde(default = "default_result_ttl_secs")]
    pub result_ttl_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_worker_concurrency() -> usize {
    4
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_job_timeout_secs() -> u64 {
    120
}

fn default_image_fetch_timeout_secs() -> u64 {
    15
}

fn default_generation_timeout_secs() -> u64 {
    60
}

fn default_max_image_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_result_ttl_secs() -> u64 {
    24 * 60 * 60
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Number of workers the API process should run alongside the server.
    pub fn embedded_worker_count(&self) -> usize {
        match (self.embedded_workers, &self.redis_url) {
            (Some(n), _) => n,
            // in-memory queue is invisible to a separate worker process
            (None, None) => self.worker_concurrency.max(1),
            (None, Some(_)) => 0,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    /// Network limits for remote providers.
    pub fn remote_options(&self) -> RemoteOptions {
        RemoteOptions {
            base_url: self.gemini_base_url.trim_end_matches('/').to_string(),
            image_fetch_timeout: Duration::from_secs(self.image_fetch_timeout_secs),
            generation_timeout: Duration::from_secs(self.generation_timeout_secs),
            max_image_bytes: self.max_image_bytes,
        }
    }

    /// Layered provider settings from this config plus the process environment.
    pub fn settings(&self) -> Settings {
        Settings::from_vars(self.default_provider.clone(), self.mock_mode, std::env::vars())
    }
}

/// Settings block for a single provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
}

/// Provider configuration consumed by the resolver and registry.
///
/// Built once at startup and shared by reference. Keys of both maps are
/// lowercase provider names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub default_provider: String,
    pub mock_mode: bool,
    pub provider_settings: HashMap<String, ProviderSettings>,
    pub api_keys: HashMap<String, String>,
}

const PROVIDER_SETTINGS_PREFIX: &str = "PROVIDER_SETTINGS__";
const API_KEYS_PREFIX: &str = "API_KEYS__";

impl Default for Settings {
    fn default() -> Self {
        let mut provider_settings = HashMap::new();
        provider_settings.insert(
            "gemini".to_string(),
            ProviderSettings {
                api_key: None,
                model_name: Some("gemini-2.5-flash".to_string()),
            },
        );
        provider_settings.insert(
            "openai".to_string(),
            ProviderSettings {
                api_key: None,
                model_name: Some("gpt-4o-mini".to_string()),
            },
        );

        Self {
            default_provider: default_provider(),
            mock_mode: false,
            provider_settings,
            api_keys: HashMap::new(),
        }
    }
}

impl Settings {
    /// Build settings from `(key, value)` environment pairs.
    ///
    /// Recognises `PROVIDER_SETTINGS__<NAME>__API_KEY`,
    /// `PROVIDER_SETTINGS__<NAME>__MODEL_NAME` and `API_KEYS__<NAME>`, case-insensitively.
    pub fn from_vars<I>(default_provider: String, mock_mode: bool, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut settings = Settings {
            default_provider: default_provider.to_lowercase(),
            mock_mode,
            ..Settings::default()
        };

        for (key, value) in vars {
            let upper = key.to_uppercase();
            if let Some(rest) = upper.strip_prefix(PROVIDER_SETTINGS_PREFIX) {
                let Some((provider, field)) = rest.split_once("__") else {
                    continue;
                };
                let entry = settings
                    .provider_settings
                    .entry(provider.to_lowercase())
                    .or_default();
                match field {
                    "API_KEY" => entry.api_key = Some(value),
                    "MODEL_NAME" => entry.model_name = Some(value),
                    _ => tracing::debug!(key = %key, "Ignoring unknown provider setting"),
                }
            } else if let Some(provider) = upper.strip_prefix(API_KEYS_PREFIX) {
                settings.api_keys.insert(provider.to_lowercase(), value);
            }
        }

        settings
    }

    pub fn provider(&self, name: &str) -> Option<&ProviderSettings> {
        self.provider_settings.get(&name.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_include_known_models() {
        let settings = Settings::from_vars("gemini".into(), false, Vec::new());
        assert_eq!(
            settings.provider("gemini").unwrap().model_name.as_deref(),
            Some("gemini-2.5-flash")
        );
        assert_eq!(
            settings.provider("OpenAI").unwrap().model_name.as_deref(),
            Some("gpt-4o-mini")
        );
        assert!(settings.api_keys.is_empty());
    }

    #[test]
    fn test_nested_provider_settings_and_flat_keys() {
        let settings = Settings::from_vars(
            "Gemini".into(),
            true,
            vars(&[
                ("PROVIDER_SETTINGS__GEMINI__API_KEY", "nested-key"),
                ("provider_settings__gemini__model_name", "gemini-2.5-pro"),
                ("PROVIDER_SETTINGS__ACME__MODEL_NAME", "acme-1"),
                ("API_KEYS__ACME", "flat-key"),
                ("UNRELATED", "x"),
            ]),
        );

        assert_eq!(settings.default_provider, "gemini");
        assert!(settings.mock_mode);
        let gemini = settings.provider("gemini").unwrap();
        assert_eq!(gemini.api_key.as_deref(), Some("nested-key"));
        assert_eq!(gemini.model_name.as_deref(), Some("gemini-2.5-pro"));
        assert_eq!(
            settings.provider("acme").unwrap().model_name.as_deref(),
            Some("acme-1")
        );
        assert_eq!(settings.api_keys.get("acme").map(String::as_str), Some("flat-key"));
    }

    #[test]
    fn test_embedded_workers_follow_backend() {
        let mut config: AppConfig = envy::from_iter(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config.embedded_worker_count(), 4);

        config.redis_url = Some("redis://localhost:6379".to_string());
        assert_eq!(config.embedded_worker_count(), 0);

        config.embedded_workers = Some(2);
        assert_eq!(config.embedded_worker_count(), 2);
    }
}
