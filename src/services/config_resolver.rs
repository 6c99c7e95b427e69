//! Layered resolution of a provider's credential and model name.
//!
//! Precedence, highest first:
//! 1. per-call overrides
//! 2. `settings.provider_settings[<name>]`
//! 3. `settings.api_keys[<name>]` (credential only)
//! 4. `<NAME>_API_KEY` environment variable (credential only)
//! 5. well-known aliases such as `GOOGLE_API_KEY` for `gemini` (credential only)
//!
//! Blank values count as absent. Nothing is cached between calls.

use crate::config::Settings;
use crate::models::provider::{ProviderConfig, ProviderOverrides};

/// Extra environment variables accepted as credentials for a provider.
const CREDENTIAL_ALIASES: &[(&str, &[&str])] = &[
    ("gemini", &["GOOGLE_API_KEY", "GOOGLE_GENERATIVE_AI_API_KEY"]),
    ("openai", &["OPENAI_KEY"]),
];

/// Resolve against the real process environment.
pub fn resolve(
    provider_name: &str,
    settings: &Settings,
    overrides: &ProviderOverrides,
) -> ProviderConfig {
    resolve_with_env(provider_name, settings, overrides, |key| {
        std::env::var(key).ok()
    })
}

/// Resolve with an explicit environment lookup.
pub fn resolve_with_env<F>(
    provider_name: &str,
    settings: &Settings,
    overrides: &ProviderOverrides,
    env: F,
) -> ProviderConfig
where
    F: Fn(&str) -> Option<String>,
{
    let name = provider_name.to_lowercase();
    let block = settings.provider(&name);

    let api_key = present(overrides.api_key.clone())
        .or_else(|| present(block.and_then(|b| b.api_key.clone())))
        .or_else(|| present(settings.api_keys.get(&name).cloned()))
        .or_else(|| present(env(&credential_env_var(&name))))
        .or_else(|| {
            aliases_for(&name)
                .iter()
                .find_map(|alias| present(env(alias)))
        });

    let model_name = present(overrides.model_name.clone())
        .or_else(|| present(block.and_then(|b| b.model_name.clone())));

    ProviderConfig {
        api_key,
        model_name,
    }
}

/// `gemini` -> `GEMINI_API_KEY`, `my-llm` -> `MY_LLM_API_KEY`.
pub fn credential_env_var(provider_name: &str) -> String {
    let stem: String = provider_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{stem}_API_KEY")
}

pub fn aliases_for(provider_name: &str) -> &'static [&'static str] {
    CREDENTIAL_ALIASES
        .iter()
        .find(|(name, _)| *name == provider_name)
        .map(|(_, aliases)| *aliases)
        .unwrap_or(&[])
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
