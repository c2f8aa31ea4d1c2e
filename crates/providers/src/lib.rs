//! Remote model service implementations for codevet.
//!
//! One backend today: the Anthropic Messages API. Everything upstream
//! talks to the [`Provider`] trait, so further backends slot in without
//! touching the orchestration engine.
//!
//! [`Provider`]: codevet_core::Provider

pub mod anthropic;

pub use anthropic::AnthropicProvider;

use codevet_config::AppConfig;
use codevet_core::{Error, Provider};
use std::sync::Arc;

/// Build the configured provider.
pub fn from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, Error> {
    let api_key = config.api_key.clone().ok_or(Error::Config {
        message: "no API key configured".into(),
    })?;
    Ok(Arc::new(AnthropicProvider::new(api_key)))
}
