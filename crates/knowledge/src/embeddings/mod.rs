//! Embedding providers.
//!
//! Provider-agnostic embedding generation behind the [`EmbeddingProvider`]
//! trait, selected by the `knowledge.embedding` configuration.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};
