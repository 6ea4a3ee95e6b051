//! Reasoning engine providers for Stepwise.
//!
//! All providers implement the `stepwise_core::Provider` trait. The loop and
//! the plan generator only ever see `Arc<dyn Provider>`.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use std::sync::Arc;
use stepwise_core::Provider;
use stepwise_core::error::ProviderError;

/// Build the configured provider.
///
/// A missing API key is not an error here: the provider is still built and
/// will answer every request with `AuthenticationFailed`, which lets
/// `state` subcommands run without credentials.
pub fn build_from_config(
    config: &stepwise_config::AppConfig,
) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config.api_key.clone().unwrap_or_default();
    let name = provider_name_for(&config.api_url);
    let provider = OpenAiCompatProvider::new(name, &config.api_url, api_key)?;
    Ok(Arc::new(provider))
}

fn provider_name_for(api_url: &str) -> &'static str {
    if api_url.contains("openrouter.ai") {
        "openrouter"
    } else if api_url.contains("localhost:11434") {
        "ollama"
    } else if api_url.contains("api.openai.com") {
        "openai"
    } else {
        "openai-compatible"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_from_default_config() {
        let config = stepwise_config::AppConfig::default();
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn provider_names_follow_endpoint() {
        assert_eq!(provider_name_for("https://openrouter.ai/api/v1"), "openrouter");
        assert_eq!(provider_name_for("http://localhost:11434/v1"), "ollama");
        assert_eq!(provider_name_for("https://llm.internal/v1"), "openai-compatible");
    }
}
