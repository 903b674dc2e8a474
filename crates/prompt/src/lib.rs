//! Prompt system for ragline.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions, built-in or per workspace
//! - Handlebars template rendering

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{builtin_prompt, list_prompts, load_prompt, DEFAULT_ANSWER_PROMPT};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptContextConfig, PromptDefinition};
