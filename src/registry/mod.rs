//! Provider registry: resolves a provider key to a live adapter.
//!
//! The factory table is closed and populated at compile time (one
//! `#[cfg]`-gated arm per built-in provider) rather than discovered at
//! runtime. Each [`crate::Client`] owns its own registry instance; there
//! is no process-wide cache.
//!
//! Resolution guarantees at most one live adapter instance per key per
//! configuration generation: a fast-path cache read, then a per-key
//! in-flight guard with a double-check, so concurrent first use of the
//! same key never constructs twice while distinct keys build in
//! parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::ProviderConfig;
use crate::error::LlmError;
use crate::provider::ProviderAdapter;

#[cfg(test)]
pub(crate) mod mock;

/// Constructor signature every built-in provider exposes.
type AdapterFactory = fn(&ProviderConfig) -> Result<Arc<dyn ProviderAdapter>, LlmError>;

fn builtin_factory(key: &str) -> Option<AdapterFactory> {
    match key {
        #[cfg(feature = "anthropic")]
        "anthropic" => Some(crate::providers::anthropic::build_adapter),
        #[cfg(feature = "groq")]
        "groq" => Some(crate::providers::groq::build_adapter),
        #[cfg(feature = "ollama")]
        "ollama" => Some(crate::providers::ollama::build_adapter),
        #[cfg(feature = "openai")]
        "openai" => Some(crate::providers::openai::build_adapter),
        #[cfg(feature = "vllm")]
        "vllm" => Some(crate::providers::vllm::build_adapter),
        #[cfg(test)]
        mock::PROVIDER_ID => Some(mock::build_adapter),
        _ => None,
    }
}

/// The provider keys with a registered adapter implementation.
///
/// Static; no adapter is instantiated. Sorted for stable error
/// messages.
pub fn supported_providers() -> Vec<&'static str> {
    let mut keys: Vec<&'static str> = Vec::new();
    #[cfg(feature = "anthropic")]
    keys.push("anthropic");
    #[cfg(feature = "groq")]
    keys.push("groq");
    #[cfg(feature = "ollama")]
    keys.push("ollama");
    #[cfg(feature = "openai")]
    keys.push("openai");
    #[cfg(feature = "vllm")]
    keys.push("vllm");
    #[cfg(test)]
    keys.push(mock::PROVIDER_ID);
    keys.sort_unstable();
    keys
}

fn unsupported(key: &str) -> LlmError {
    LlmError::UnsupportedProvider {
        provider: key.to_string(),
        supported: supported_providers()
            .iter()
            .map(|s| s.to_string())
            .collect(),
    }
}

/// Per-client adapter cache and configuration store.
pub struct ProviderRegistry {
    configs: Mutex<HashMap<String, ProviderConfig>>,
    adapters: Mutex<HashMap<String, Arc<dyn ProviderAdapter>>>,
    /// Per-key build locks deduplicating concurrent first use.
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Default for ProviderRegistry {
    /// An empty registry: no configuration, nothing cached.
    fn default() -> Self {
        Self {
            configs: Mutex::new(HashMap::new()),
            adapters: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }
}

impl ProviderRegistry {
    /// Create a registry holding the given per-provider configuration.
    ///
    /// Keys are normalized and validated up front; adapters themselves
    /// are constructed lazily on first use.
    pub fn new(configs: HashMap<String, ProviderConfig>) -> Result<Self, LlmError> {
        let mut normalized = HashMap::new();
        for (key, config) in configs {
            normalized.insert(Self::validate_key(&key)?, config);
        }
        Ok(Self {
            configs: Mutex::new(normalized),
            adapters: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        })
    }

    fn validate_key(key: &str) -> Result<String, LlmError> {
        let key = key.trim().to_ascii_lowercase();
        if builtin_factory(&key).is_none() {
            return Err(unsupported(&key));
        }
        Ok(key)
    }

    /// Instantiate the adapter registered for `key` with `config`.
    ///
    /// Construction-time configuration errors pass through unchanged;
    /// anything else an adapter raises is wrapped in
    /// `AdapterConstruction`.
    pub fn create_adapter(
        key: &str,
        config: &ProviderConfig,
    ) -> Result<Arc<dyn ProviderAdapter>, LlmError> {
        let factory = builtin_factory(key).ok_or_else(|| unsupported(key))?;
        factory(config).map_err(|e| match e {
            err @ (LlmError::MissingCredential { .. } | LlmError::MissingEndpoint { .. }) => err,
            other => LlmError::AdapterConstruction {
                provider: key.to_string(),
                source: Box::new(other),
            },
        })
    }

    fn cached(&self, key: &str) -> Result<Option<Arc<dyn ProviderAdapter>>, LlmError> {
        Ok(self.lock_adapters()?.get(key).cloned())
    }

    /// Return the cached adapter for `key`, constructing and caching it
    /// first if absent.
    pub async fn resolve(&self, key: &str) -> Result<Arc<dyn ProviderAdapter>, LlmError> {
        if let Some(adapter) = self.cached(key)? {
            return Ok(adapter);
        }

        // One builder per key; other first-users wait here and then see
        // the cached instance in the double-check.
        let build_lock = {
            let mut in_flight = self
                .in_flight
                .lock()
                .map_err(|_| LlmError::InternalError("registry lock poisoned".to_string()))?;
            Arc::clone(
                in_flight
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
            )
        };
        let _guard = build_lock.lock().await;

        if let Some(adapter) = self.cached(key)? {
            return Ok(adapter);
        }

        let config = self
            .configs
            .lock()
            .map_err(|_| LlmError::InternalError("registry lock poisoned".to_string()))?
            .get(key)
            .cloned()
            .unwrap_or_default();
        let built = Self::create_adapter(key, &config)?;
        self.lock_adapters()?.insert(key.to_string(), built.clone());
        tracing::debug!(provider = key, "constructed and cached adapter");
        Ok(built)
    }

    /// Merge `new_configs` into the stored configuration (per-key
    /// overwrite), then eagerly rebuild and replace the cached adapter
    /// for every key present in `new_configs`.
    ///
    /// Replacement is install-then-publish: the new instance is fully
    /// constructed before it is swapped into the cache, so a concurrent
    /// `resolve` observes either the old or the new adapter, never a
    /// partial one. In-flight calls holding the old instance drain
    /// against it; its resources release when the last handle drops.
    pub fn configure(&self, new_configs: HashMap<String, ProviderConfig>) -> Result<(), LlmError> {
        let mut validated = Vec::with_capacity(new_configs.len());
        for (key, config) in new_configs {
            validated.push((Self::validate_key(&key)?, config));
        }

        for (key, config) in validated {
            let built = Self::create_adapter(&key, &config)?;
            self.configs
                .lock()
                .map_err(|_| LlmError::InternalError("registry lock poisoned".to_string()))?
                .insert(key.clone(), config);
            let replaced = self.lock_adapters()?.insert(key.clone(), built);
            if replaced.is_some() {
                tracing::debug!(provider = %key, "replaced cached adapter after reconfigure");
            }
        }
        Ok(())
    }

    /// Close and drop every cached adapter. Safe to call repeatedly.
    pub async fn close(&self) {
        let drained: Vec<Arc<dyn ProviderAdapter>> = match self.lock_adapters() {
            Ok(mut adapters) => adapters.drain().map(|(_, adapter)| adapter).collect(),
            Err(_) => return,
        };
        for adapter in drained {
            adapter.close().await;
        }
    }

    fn lock_adapters(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, Arc<dyn ProviderAdapter>>>, LlmError>
    {
        self.adapters
            .lock()
            .map_err(|_| LlmError::InternalError("registry lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    fn empty_registry() -> ProviderRegistry {
        ProviderRegistry::new(HashMap::new()).unwrap()
    }

    #[tokio::test]
    async fn resolve_returns_the_identical_cached_instance() {
        let registry = empty_registry();
        let first = registry.resolve(mock::PROVIDER_ID).await.unwrap();
        let second = registry.resolve(mock::PROVIDER_ID).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn configure_replaces_the_cached_instance() {
        let registry = empty_registry();
        let before = registry.resolve(mock::PROVIDER_ID).await.unwrap();

        let mut configs = HashMap::new();
        configs.insert(
            mock::PROVIDER_ID.to_string(),
            ProviderConfig::new().with_extra("reply", "fresh"),
        );
        registry.configure(configs).unwrap();

        let after = registry.resolve(mock::PROVIDER_ID).await.unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        // The drained handle keeps working against the old instance.
        assert_eq!(before.provider_id(), mock::PROVIDER_ID);
    }

    #[test]
    fn create_adapter_rejects_unknown_keys() {
        let err = ProviderRegistry::create_adapter("doesnotexist", &ProviderConfig::new())
            .err()
            .unwrap();
        match err {
            LlmError::UnsupportedProvider {
                provider,
                supported,
            } => {
                assert_eq!(provider, "doesnotexist");
                assert!(supported.contains(&mock::PROVIDER_ID.to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn construction_failures_are_wrapped() {
        let config = ProviderConfig::new().with_extra("fail_construct", true);
        let err = ProviderRegistry::create_adapter(mock::PROVIDER_ID, &config)
            .err()
            .unwrap();
        assert!(matches!(err, LlmError::AdapterConstruction { .. }));
    }

    #[test]
    fn configure_rejects_unknown_keys_without_partial_application() {
        let registry = empty_registry();
        let mut configs = HashMap::new();
        configs.insert(mock::PROVIDER_ID.to_string(), ProviderConfig::new());
        configs.insert("doesnotexist".to_string(), ProviderConfig::new());
        assert!(registry.configure(configs).is_err());
        // Nothing was cached by the failed call.
        assert!(registry.cached(mock::PROVIDER_ID).unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_first_use_constructs_once() {
        mock::BUILD_COUNT.store(0, Ordering::SeqCst);
        let mut configs = HashMap::new();
        configs.insert(
            mock::PROVIDER_ID.to_string(),
            ProviderConfig::new().with_extra("count_builds", true),
        );
        let registry = Arc::new(ProviderRegistry::new(configs).unwrap());

        let mut joins = Vec::new();
        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            joins.push(tokio::spawn(async move {
                registry.resolve(mock::PROVIDER_ID).await.unwrap()
            }));
        }
        let mut resolved = Vec::new();
        for join in joins {
            resolved.push(join.await.unwrap());
        }

        assert_eq!(mock::BUILD_COUNT.load(Ordering::SeqCst), 1);
        for adapter in &resolved[1..] {
            assert!(Arc::ptr_eq(&resolved[0], adapter));
        }
    }

    #[tokio::test]
    async fn close_drains_the_cache() {
        let registry = empty_registry();
        let _ = registry.resolve(mock::PROVIDER_ID).await.unwrap();
        registry.close().await;
        assert!(registry.cached(mock::PROVIDER_ID).unwrap().is_none());
        // Idempotent.
        registry.close().await;
    }

    #[test]
    fn construction_validates_configured_keys() {
        let mut configs = HashMap::new();
        configs.insert("doesnotexist".to_string(), ProviderConfig::new());
        assert!(matches!(
            ProviderRegistry::new(configs),
            Err(LlmError::UnsupportedProvider { .. })
        ));

        // Keys are normalized the same way model identifiers are.
        let mut configs = HashMap::new();
        configs.insert(" MockProv ".to_string(), ProviderConfig::new());
        assert!(ProviderRegistry::new(configs).is_ok());
    }

    #[test]
    fn supported_set_is_sorted_and_static() {
        let supported = supported_providers();
        let mut sorted = supported.clone();
        sorted.sort_unstable();
        assert_eq!(supported, sorted);
        assert!(supported.contains(&mock::PROVIDER_ID));
    }
}
