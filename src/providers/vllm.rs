//! vLLM provider (self-hosted OpenAI-compatible server).
//!
//! Unlike the hosted vendors there is no default endpoint; the serving
//! URL must come from the provider config or `VLLM_API_BASE_URL`.

use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::error::LlmError;
use crate::provider::ProviderAdapter;

use super::openai_compatible::{CompatDefaults, OpenAiCompatibleAdapter};

const DEFAULTS: CompatDefaults = CompatDefaults {
    provider_id: "vllm",
    env_api_key: "VLLM_API_KEY",
    env_base_url: Some("VLLM_API_BASE_URL"),
    default_base_url: None,
};

pub(crate) fn build_adapter(config: &ProviderConfig) -> Result<Arc<dyn ProviderAdapter>, LlmError> {
    Ok(Arc::new(OpenAiCompatibleAdapter::from_config(
        DEFAULTS, config,
    )?))
}
