//! Configuration management for ragline.
//!
//! Configuration is merged from several sources, lowest precedence first:
//! - Built-in defaults
//! - `.ragline/config.yaml` in the workspace (or `RAGLINE_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! Provider credentials are not stored here; they are resolved from the
//! environment by `ragline-llm` when a client is created.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Name of the per-workspace state directory.
pub const STATE_DIR: &str = ".ragline";

/// Provider names accepted by `--provider` / `RAGLINE_PROVIDER`.
pub const KNOWN_PROVIDERS: [&str; 7] = [
    "openai",
    "groq",
    "google",
    "gemini",
    "perplexity",
    "pplx",
    "ollama",
];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Workspace root (contains `.ragline/`)
    pub workspace: PathBuf,

    /// Optional explicit config file path
    pub config_file: Option<PathBuf>,

    /// Pinned LLM provider; `None` means first credential found wins
    pub provider: Option<String>,

    /// Model override for the selected provider
    pub model: Option<String>,

    /// Maximum tokens per generated answer
    pub max_tokens: Option<u32>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Top-level layout of `config.yaml` as far as the core crate cares.
///
/// Other sections (e.g. `knowledge`) are read by the crates that own them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    llm: Option<LlmSection>,
    #[serde(default)]
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LlmSection {
    provider: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub workspace: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub log_level: Option<String>,
    pub verbose: bool,
    pub no_color: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: None,
            model: None,
            max_tokens: None,
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML file, the environment and
    /// the command-line `overrides`, in that order of precedence.
    ///
    /// The YAML file is read from the workspace and config path left after
    /// flags are applied, so `--workspace`/`--config` pick the file that is
    /// merged.
    ///
    /// Environment variables:
    /// - `RAGLINE_WORKSPACE`: Override workspace path
    /// - `RAGLINE_CONFIG`: Path to config file
    /// - `RAGLINE_PROVIDER`: Pin the LLM provider
    /// - `RAGLINE_MODEL`: Model identifier
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use ragline_core::config::{AppConfig, Overrides};
    ///
    /// let config = AppConfig::load(Overrides::default()).expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load(overrides: Overrides) -> AppResult<Self> {
        Self::load_with(overrides, |key| std::env::var(key).ok())
    }

    /// [`load`](Self::load) against an arbitrary environment lookup.
    pub fn load_with<F>(overrides: Overrides, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(workspace) = overrides
            .workspace
            .clone()
            .or_else(|| lookup("RAGLINE_WORKSPACE").map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        config.config_file = overrides
            .config_file
            .clone()
            .or_else(|| lookup("RAGLINE_CONFIG").map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config.config_path();
        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Some(provider) = lookup("RAGLINE_PROVIDER") {
            config.provider = Some(provider);
        }

        if let Some(model) = lookup("RAGLINE_MODEL") {
            config.model = Some(model);
        }

        if let Some(level) = lookup("RUST_LOG") {
            config.log_level = Some(level);
        }

        if lookup("NO_COLOR").is_some() {
            config.no_color = true;
        }

        Ok(config.apply_flags(overrides))
    }

    /// Merge a YAML configuration file into this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            if llm.provider.is_some() {
                result.provider = llm.provider;
            }
            if llm.model.is_some() {
                result.model = llm.model;
            }
            if llm.max_tokens.is_some() {
                result.max_tokens = llm.max_tokens;
            }
        }

        Ok(result)
    }

    /// Apply command-line flags on top of YAML and environment.
    ///
    /// Workspace and config path are consumed by [`load_with`](Self::load_with)
    /// before the YAML merge.
    fn apply_flags(mut self, overrides: Overrides) -> Self {
        let Overrides {
            provider,
            model,
            log_level,
            verbose,
            no_color,
            ..
        } = overrides;

        if let Some(provider) = provider {
            self.provider = Some(provider);
        }

        if let Some(model) = model {
            self.model = Some(model);
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Path to the `.ragline` state directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(STATE_DIR)
    }

    /// Path of the YAML config file that applies to this workspace.
    pub fn config_path(&self) -> PathBuf {
        match self.config_file {
            Some(ref cf) => cf.clone(),
            None => self.state_dir().join("config.yaml"),
        }
    }

    /// Validate settings that can be checked without touching the network.
    pub fn validate(&self) -> AppResult<()> {
        if let Some(ref provider) = self.provider {
            let normalized = provider.to_lowercase();
            if !KNOWN_PROVIDERS.contains(&normalized.as_str()) {
                return Err(AppError::Config(format!(
                    "Unknown provider: {}. Supported: {}",
                    provider,
                    KNOWN_PROVIDERS.join(", ")
                )));
            }
        }

        if self.max_tokens == Some(0) {
            return Err(AppError::Config(
                "maxTokens must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
