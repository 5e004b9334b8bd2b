//! LLM provider implementations.
//!
//! Contains the OpenAI-compatible implementation of the [`LlmProvider`]
//! trait defined in `concierge-core`, and a factory ([`create_provider`])
//! that builds it from [`GlobalConfig`] and the API key.
//!
//! [`LlmProvider`]: concierge_core::llm::provider::LlmProvider

pub mod openai_compat;

use secrecy::SecretString;

use concierge_core::llm::box_provider::BoxLlmProvider;
use concierge_types::config::GlobalConfig;
use concierge_types::llm::LlmError;

use self::openai_compat::OpenAiCompatibleProvider;
use self::openai_compat::config::OpenAiCompatConfig;

/// Create a [`BoxLlmProvider`] from the global configuration.
///
/// `base_url` in the config selects a compatible server; without it the
/// public OpenAI endpoint is used.
///
/// # Errors
///
/// Returns [`LlmError::AuthenticationFailed`] when no API key is available.
pub fn create_provider(
    config: &GlobalConfig,
    api_key: Option<SecretString>,
) -> Result<BoxLlmProvider, LlmError> {
    let key = api_key.ok_or(LlmError::AuthenticationFailed)?;

    let provider = match config.base_url.as_deref() {
        Some(base_url) => OpenAiCompatibleProvider::new(OpenAiCompatConfig {
            provider_name: config.provider_name.clone(),
            base_url: base_url.to_string(),
            api_key: key,
            model: config.model.clone(),
        }),
        None => OpenAiCompatibleProvider::openai(key, &config.model),
    };

    tracing::debug!(
        provider = %config.provider_name,
        model = %config.model,
        "created LLM provider"
    );
    Ok(BoxLlmProvider::new(provider))
}
