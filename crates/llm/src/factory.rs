//! LLM provider factory.
//!
//! Builds the client for a resolved [`ProviderSelection`].

use crate::client::LlmClient;
use crate::credentials::ProviderSelection;
use crate::providers::{GeminiClient, OllamaClient, OpenAiCompatClient};
use crate::types::ProviderType;
use ragline_core::{AppError, AppResult};
use std::sync::Arc;

/// Create an LLM client for the selected provider.
///
/// # Errors
/// Returns `AppError::Generation` if a hosted provider has no API key.
pub fn create_client(selection: &ProviderSelection) -> AppResult<Arc<dyn LlmClient>> {
    let api_key = || {
        selection.api_key.clone().ok_or_else(|| {
            AppError::Generation(format!(
                "Provider '{}' requires {}",
                selection.provider,
                selection.provider.credential_env()
            ))
        })
    };

    let client: Arc<dyn LlmClient> = match selection.provider {
        ProviderType::Ollama => Arc::new(OllamaClient::with_base_url(&selection.endpoint)),
        ProviderType::Google => Arc::new(GeminiClient::new(&selection.endpoint, api_key()?)),
        ProviderType::OpenAI | ProviderType::Groq | ProviderType::Perplexity => Arc::new(
            OpenAiCompatClient::new(selection.provider, &selection.endpoint, api_key()?),
        ),
    };

    tracing::debug!("Created {} client", client.provider_name());
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(provider: ProviderType, api_key: Option<&str>) -> ProviderSelection {
        ProviderSelection {
            provider,
            model: provider.default_model().to_string(),
            api_key: api_key.map(str::to_string),
            endpoint: provider.default_endpoint().to_string(),
        }
    }

    #[test]
    fn test_create_each_provider() {
        for provider in ProviderType::PREFERENCE {
            let client = create_client(&selection(provider, Some("k"))).unwrap();
            assert_eq!(client.provider_name(), provider.as_str());
        }
    }

    #[test]
    fn test_ollama_needs_no_key() {
        assert!(create_client(&selection(ProviderType::Ollama, None)).is_ok());
    }

    #[test]
    fn test_hosted_provider_requires_key() {
        match create_client(&selection(ProviderType::OpenAI, None)) {
            Err(err) => assert!(err.to_string().contains("OPENAI_API_KEY")),
            Ok(_) => panic!("Expected error for OpenAI without API key"),
        }
    }
}
