//! Provider identities and their environment conventions.

use serde::{Deserialize, Serialize};

/// Provider type enum for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    OpenAI,
    Groq,
    Google,
    Perplexity,
    Ollama,
}

impl ProviderType {
    /// Providers in the order their credentials are looked up.
    pub const PREFERENCE: [ProviderType; 5] = [
        Self::OpenAI,
        Self::Groq,
        Self::Google,
        Self::Perplexity,
        Self::Ollama,
    ];

    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Some(Self::OpenAI),
            "groq" => Some(Self::Groq),
            "google" | "gemini" => Some(Self::Google),
            "perplexity" | "pplx" => Some(Self::Perplexity),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Groq => "groq",
            Self::Google => "google",
            Self::Perplexity => "perplexity",
            Self::Ollama => "ollama",
        }
    }

    /// Environment variable holding the credential for this provider.
    ///
    /// For Ollama this is the endpoint of the local runtime rather than a
    /// secret.
    pub fn credential_env(&self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Groq => "GROQ_API_KEY",
            Self::Google => "GOOGLE_API_KEY",
            Self::Perplexity => "PPLX_API_KEY",
            Self::Ollama => "OLLAMA_URL",
        }
    }

    /// Environment variable overriding the model for this provider.
    pub fn model_env(&self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_MODEL",
            Self::Groq => "GROQ_MODEL",
            Self::Google => "GOOGLE_MODEL",
            Self::Perplexity => "PPLX_MODEL",
            Self::Ollama => "OLLAMA_MODEL",
        }
    }

    /// Model used when neither flags nor environment name one.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAI => "gpt-4o-mini",
            Self::Groq => "llama-3.1-8b-instant",
            Self::Google => "gemini-2.0-flash",
            Self::Perplexity => "sonar",
            Self::Ollama => "llama3.2",
        }
    }

    /// Base URL of the provider's API.
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::OpenAI => "https://api.openai.com/v1",
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::Google => "https://generativelanguage.googleapis.com/v1beta",
            Self::Perplexity => "https://api.perplexity.ai",
            Self::Ollama => "http://localhost:11434",
        }
    }

    /// Whether the credential is a secret API key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
