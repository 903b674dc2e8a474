//! LLM integration crate for ragline.
//!
//! Provider-agnostic access to Large Language Models through the
//! [`LlmClient`] trait.
//!
//! # Providers
//! - **OpenAI**, **Groq**, **Perplexity**: OpenAI-compatible chat completions
//! - **Google**: Gemini `generateContent`
//! - **Ollama**: local runtime
//!
//! # Example
//! ```no_run
//! use ragline_llm::{create_client, resolve_from_env, LlmRequest};
//!
//! # async fn example() -> ragline_core::AppResult<()> {
//! let selection = resolve_from_env(None, None)?;
//! let client = create_client(&selection)?;
//! let request = LlmRequest::new("Hello, world!", selection.model.clone());
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod credentials;
pub mod factory;
pub mod providers;
pub mod types;

pub use client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
pub use credentials::{credential_keys, resolve_from_env, resolve_provider, ProviderSelection};
pub use factory::create_client;
pub use types::ProviderType;
