//! Prompt types for ragline.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Optional system message template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Context assembly settings
    #[serde(default)]
    pub context: PromptContextConfig,

    /// User message template with Handlebars syntax
    pub template: String,
}

/// How retrieved chunks are assembled into the `{{context}}` variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptContextConfig {
    /// String placed between consecutive chunk texts
    #[serde(rename = "chunkSeparator", default = "default_chunk_separator")]
    pub chunk_separator: String,
}

fn default_chunk_separator() -> String {
    "\n".to_string()
}

impl Default for PromptContextConfig {
    fn default() -> Self {
        Self {
            chunk_separator: default_chunk_separator(),
        }
    }
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message (optional)
    pub system: Option<String>,

    /// User message (required)
    pub user: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Template variables that were resolved
    #[serde(rename = "resolvedVariables")]
    pub resolved_variables: HashMap<String, String>,
}
