//! Groq provider (OpenAI-compatible endpoint).

use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::error::LlmError;
use crate::provider::ProviderAdapter;

use super::openai_compatible::{CompatDefaults, OpenAiCompatibleAdapter};

const DEFAULTS: CompatDefaults = CompatDefaults {
    provider_id: "groq",
    env_api_key: "GROQ_API_KEY",
    env_base_url: None,
    default_base_url: Some("https://api.groq.com/openai/v1"),
};

pub(crate) fn build_adapter(config: &ProviderConfig) -> Result<Arc<dyn ProviderAdapter>, LlmError> {
    Ok(Arc::new(OpenAiCompatibleAdapter::from_config(
        DEFAULTS, config,
    )?))
}
