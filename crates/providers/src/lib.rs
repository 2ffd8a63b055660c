//! LLM Provider implementations for shellpilot.
//!
//! All providers implement the `shellpilot_core::Provider` trait.

pub mod anthropic;

pub use anthropic::AnthropicProvider;

use shellpilot_config::AppConfig;
use shellpilot_core::error::ProviderError;

/// Build the configured provider. Fails when no API key is available.
pub fn from_config(config: &AppConfig) -> Result<AnthropicProvider, ProviderError> {
    let key = config.api_key.clone().ok_or_else(|| {
        ProviderError::NotConfigured(
            "no API key; set ANTHROPIC_API_KEY or `shellpilot settings set api_key ...`".into(),
        )
    })?;
    Ok(AnthropicProvider::new(key).with_base_url(&config.api_url))
}
