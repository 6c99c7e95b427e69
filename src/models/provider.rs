use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Resolved credentials and model for one provider. Never stored on a job.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub model_name: Option<String>,
}

impl ProviderConfig {
    /// Copy safe to log or embed in an error.
    pub fn redacted(&self) -> Self {
        Self {
            api_key: self.api_key.as_ref().map(|_| REDACTED.to_string()),
            model_name: self.model_name.clone(),
        }
    }
}

const REDACTED: &str = "[REDACTED]";

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| REDACTED))
            .field("model_name", &self.model_name)
            .finish()
    }
}

/// Per-call overrides; the highest-precedence configuration tier.
///
/// Built in code only. Not deserializable, so a credential can never arrive
/// through a query string or request body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderOverrides {
    pub api_key: Option<String>,
    pub model_name: Option<String>,
}

/// GET /v1/providers response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProvidersResponse {
    pub default_provider: String,
    pub mock_mode: bool,
    pub available_providers: Vec<String>,
    pub providers: BTreeMap<String, ProviderStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub credential_configured: bool,
    pub model_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_never_prints_key() {
        let config = ProviderConfig {
            api_key: Some("sk-live-123".to_string()),
            model_name: Some("gemini-2.5-flash".to_string()),
        };
        let printed = format!("{config:?}");
        assert!(!printed.contains("sk-live-123"));
        assert!(printed.contains("gemini-2.5-flash"));
        assert_eq!(config.redacted().api_key.as_deref(), Some(REDACTED));
    }
}
