//! Configuration loading and validation for codevet.
//!
//! Loads `codevet.toml` from the working directory (or an explicit path)
//! with environment variable overrides for secrets. Validation failures
//! are fatal at startup — the assistant never starts a turn with a broken
//! configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "codevet.toml";

/// Environment variable consulted when the config file carries no key.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// The root configuration structure.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Anthropic API key; falls back to `ANTHROPIC_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model used for drafting answers.
    #[serde(default = "default_model")]
    pub model: String,

    /// Model used by the reviewer; defaults to the drafting model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_model: Option<String>,

    /// Maximum output tokens per drafting call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Maximum output tokens per review call.
    #[serde(default = "default_review_max_tokens")]
    pub review_max_tokens: u32,

    /// Directories the project-structure tool always skips.
    #[serde(default)]
    pub exclude_dirs: Vec<String>,
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_max_tokens() -> u32 {
    8192
}
fn default_review_max_tokens() -> u32 {
    2000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            review_model: None,
            max_tokens: default_max_tokens(),
            review_max_tokens: default_review_max_tokens(),
            exclude_dirs: Vec::new(),
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field(
                "api_key",
                &self.api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("model", &self.model)
            .field("review_model", &self.review_model)
            .field("max_tokens", &self.max_tokens)
            .field("review_max_tokens", &self.review_max_tokens)
            .field("exclude_dirs", &self.exclude_dirs)
            .finish()
    }
}

impl AppConfig {
    /// Load, apply env overrides, and validate. Missing file falls back
    /// to defaults (the API key can still come from the environment).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            toml::from_str(&raw)?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            AppConfig::default()
        };

        config.apply_env();
        config.validate()?;
        tracing::info!(?config, "configuration loaded");
        Ok(config)
    }

    /// Load from `codevet.toml` in the working directory.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(Path::new(DEFAULT_CONFIG_FILE))
    }

    fn apply_env(&mut self) {
        if self.api_key.is_none()
            && let Ok(key) = std::env::var(API_KEY_ENV)
            && !key.is_empty()
        {
            self.api_key = Some(key);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.as_deref().unwrap_or_default().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "no API key configured: set `api_key` in {DEFAULT_CONFIG_FILE} or export {API_KEY_ENV}"
            )));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::Invalid("max_tokens must be positive".into()));
        }
        if self.model.is_empty() {
            return Err(ConfigError::Invalid("model must not be empty".into()));
        }
        Ok(())
    }

    /// The model the reviewer should call.
    pub fn review_model(&self) -> &str {
        self.review_model.as_deref().unwrap_or(&self.model)
    }
}
