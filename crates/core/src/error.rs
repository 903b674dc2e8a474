//! Error types for ragline.
//!
//! A single error enum covers every failure category the assistant can
//! surface: configuration, corpus access, retrieval, generation, prompt
//! rendering, I/O and serialization.

use thiserror::Error;

/// Unified error type for ragline.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
/// Errors are propagated to the top-level caller and never swallowed.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing credentials, invalid settings, unparsable config files
    #[error("Configuration error: {0}")]
    Config(String),

    /// The document corpus could not be read
    #[error("File access error: {0}")]
    FileAccess(String),

    /// Embedding provider or vector store failure, or nothing to retrieve
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// LLM provider failure or missing provider credential
    #[error("Generation error: {0}")]
    Generation(String),

    /// Prompt loading or rendering errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// I/O errors outside of corpus loading
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Operator-facing name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "ConfigurationError",
            AppError::FileAccess(_) => "FileAccessError",
            AppError::Retrieval(_) => "RetrievalError",
            AppError::Generation(_) => "GenerationError",
            AppError::Prompt(_) => "PromptError",
            AppError::Io(_) => "IoError",
            AppError::Serialization(_) => "SerializationError",
            AppError::Other(_) => "Error",
        }
    }

    /// Whether an interactive session may continue with the next query.
    ///
    /// Retrieval and generation failures are per-query; everything else
    /// means the session itself is broken.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AppError::Retrieval(_) | AppError::Generation(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(AppError::Config("x".into()).kind(), "ConfigurationError");
        assert_eq!(AppError::FileAccess("x".into()).kind(), "FileAccessError");
        assert_eq!(AppError::Retrieval("x".into()).kind(), "RetrievalError");
        assert_eq!(AppError::Generation("x".into()).kind(), "GenerationError");
    }

    #[test]
    fn test_recoverable() {
        assert!(AppError::Retrieval("empty".into()).is_recoverable());
        assert!(AppError::Generation("timeout".into()).is_recoverable());
        assert!(!AppError::Config("no key".into()).is_recoverable());
        assert!(!AppError::FileAccess("denied".into()).is_recoverable());
    }

    #[test]
    fn test_display_includes_cause() {
        let err = AppError::Generation("missing GROQ_API_KEY".into());
        assert_eq!(err.to_string(), "Generation error: missing GROQ_API_KEY");
    }

    #[test]
    fn test_from_yaml_error() {
        let err: AppError = serde_yaml::from_str::<Vec<u32>>("{not: [a list")
            .unwrap_err()
            .into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
