//! OpenAI provider.

use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::error::LlmError;
use crate::provider::ProviderAdapter;

use super::openai_compatible::{CompatDefaults, OpenAiCompatibleAdapter};

const DEFAULTS: CompatDefaults = CompatDefaults {
    provider_id: "openai",
    env_api_key: "OPENAI_API_KEY",
    env_base_url: None,
    default_base_url: Some("https://api.openai.com/v1"),
};

pub(crate) fn build_adapter(config: &ProviderConfig) -> Result<Arc<dyn ProviderAdapter>, LlmError> {
    Ok(Arc::new(OpenAiCompatibleAdapter::from_config(
        DEFAULTS, config,
    )?))
}
