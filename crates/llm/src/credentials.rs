//! Provider credential resolution.
//!
//! Exactly one LLM provider is selected per session. Unless a provider is
//! pinned, the first provider whose credential is present in the environment
//! wins, in [`ProviderType::PREFERENCE`] order.

use crate::types::ProviderType;
use ragline_core::{AppError, AppResult};

/// The provider chosen for a session, with everything needed to build a client.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderSelection {
    pub provider: ProviderType,
    pub model: String,
    /// API key for hosted providers; `None` for Ollama
    pub api_key: Option<String>,
    pub endpoint: String,
}

impl std::fmt::Debug for ProviderSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSelection")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// All environment keys that can satisfy the credential requirement.
pub fn credential_keys() -> Vec<&'static str> {
    ProviderType::PREFERENCE
        .iter()
        .map(|p| p.credential_env())
        .collect()
}

/// Resolve the provider using the process environment.
pub fn resolve_from_env(
    pinned: Option<&str>,
    model_override: Option<&str>,
) -> AppResult<ProviderSelection> {
    resolve_provider(pinned, model_override, |key| std::env::var(key).ok())
}

/// Resolve the provider from an arbitrary variable lookup.
///
/// # Errors
/// - `AppError::Config` when no credential key is set at all, pinned or not,
///   or when the pinned name is unknown
/// - `AppError::Generation` when the pinned provider's key is missing; the
///   message names that key
pub fn resolve_provider<F>(
    pinned: Option<&str>,
    model_override: Option<&str>,
    lookup: F,
) -> AppResult<ProviderSelection>
where
    F: Fn(&str) -> Option<String>,
{
    let present = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if credential_keys().into_iter().all(|key| present(key).is_none()) {
        return Err(AppError::Config(format!(
            "No valid API key found. Please set one of: {}",
            credential_keys().join(", ")
        )));
    }

    let provider = match pinned {
        Some(name) => {
            let provider = ProviderType::parse(name).ok_or_else(|| {
                AppError::Config(format!("Unknown provider: {}", name))
            })?;

            if provider.requires_api_key() && present(provider.credential_env()).is_none() {
                return Err(AppError::Generation(format!(
                    "Provider '{}' is selected but its credential is missing: set {}",
                    provider,
                    provider.credential_env()
                )));
            }

            provider
        }
        None => ProviderType::PREFERENCE
            .into_iter()
            .find(|p| present(p.credential_env()).is_some())
            .ok_or_else(|| AppError::Config("No provider credential is set".to_string()))?,
    };

    let model = model_override
        .map(str::to_string)
        .or_else(|| present(provider.model_env()))
        .unwrap_or_else(|| provider.default_model().to_string());

    let (api_key, endpoint) = if provider.requires_api_key() {
        (
            present(provider.credential_env()),
            provider.default_endpoint().to_string(),
        )
    } else {
        (
            None,
            present(provider.credential_env())
                .unwrap_or_else(|| provider.default_endpoint().to_string()),
        )
    };

    tracing::info!("Using {} model: {}", provider, model);

    Ok(ProviderSelection {
        provider,
        model,
        api_key,
        endpoint,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_no_credentials_is_config_error() {
        let err = resolve_provider(None, None, env(&[])).unwrap_err();
        assert_eq!(err.kind(), "ConfigurationError");
        let message = err.to_string();
        for key in credential_keys() {
            assert!(message.contains(key), "missing {} in {}", key, message);
        }
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let result = resolve_provider(None, None, env(&[("OPENAI_API_KEY", "  ")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_preference_order() {
        let selection = resolve_provider(
            None,
            None,
            env(&[("GOOGLE_API_KEY", "g"), ("GROQ_API_KEY", "q")]),
        )
        .unwrap();
        assert_eq!(selection.provider, ProviderType::Groq);
        assert_eq!(selection.model, "llama-3.1-8b-instant");
        assert_eq!(selection.api_key.as_deref(), Some("q"));
    }

    #[test]
    fn test_model_env_and_override() {
        let lookup = env(&[("OPENAI_API_KEY", "k"), ("OPENAI_MODEL", "gpt-4o")]);
        let selection = resolve_provider(None, None, &lookup).unwrap();
        assert_eq!(selection.model, "gpt-4o");

        let selection = resolve_provider(None, Some("gpt-4.1"), &lookup).unwrap();
        assert_eq!(selection.model, "gpt-4.1");
    }

    #[test]
    fn test_pinned_provider_missing_key_names_it() {
        let err = resolve_provider(Some("perplexity"), None, env(&[("OPENAI_API_KEY", "k")]))
            .unwrap_err();
        assert_eq!(err.kind(), "GenerationError");
        assert!(err.to_string().contains("PPLX_API_KEY"));
    }

    #[test]
    fn test_pinned_unknown_provider() {
        let result = resolve_provider(Some("mystery"), None, env(&[]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_ollama_uses_url_as_endpoint() {
        let selection =
            resolve_provider(None, None, env(&[("OLLAMA_URL", "http://gpu-box:11434")])).unwrap();
        assert_eq!(selection.provider, ProviderType::Ollama);
        assert_eq!(selection.endpoint, "http://gpu-box:11434");
        assert!(selection.api_key.is_none());
    }

    #[test]
    fn test_pinned_ollama_without_url_uses_default() {
        let selection =
            resolve_provider(Some("ollama"), None, env(&[("GROQ_API_KEY", "q")])).unwrap();
        assert_eq!(selection.endpoint, "http://localhost:11434");
    }

    #[test]
    fn test_pinned_provider_with_no_credentials_is_config_error() {
        for pinned in ["openai", "ollama"] {
            let err = resolve_provider(Some(pinned), None, env(&[])).unwrap_err();
            assert_eq!(err.kind(), "ConfigurationError", "pinned {}", pinned);
            assert!(err.to_string().contains("OLLAMA_URL"));
        }
    }

    #[test]
    fn test_debug_redacts_key() {
        let selection =
            resolve_provider(None, None, env(&[("OPENAI_API_KEY", "sk-secret")])).unwrap();
        let debug = format!("{:?}", selection);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
