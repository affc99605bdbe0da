//! Per-provider configuration.

use std::time::Duration;

use secrecy::SecretString;

/// Configuration for one provider key.
///
/// Well-known fields cover what every adapter needs; anything
/// vendor-specific goes in `extra` and is interpreted by the adapter
/// alone. Unset credentials and endpoints fall back to the provider's
/// environment variable at construction time.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProviderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_extra(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}
