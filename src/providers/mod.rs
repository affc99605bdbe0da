//! Built-in vendor adapters.
//!
//! Each module wraps exactly one vendor protocol behind the
//! [`ProviderAdapter`](crate::provider::ProviderAdapter) interface and
//! exposes a `build_adapter` constructor for the registry's factory
//! table. Providers are feature-gated; `all-providers` (the default)
//! enables the full set.

#[cfg(feature = "anthropic")]
pub(crate) mod anthropic;
#[cfg(feature = "groq")]
pub(crate) mod groq;
#[cfg(feature = "ollama")]
pub(crate) mod ollama;
#[cfg(any(feature = "openai", feature = "groq", feature = "vllm"))]
pub(crate) mod openai_compatible;
#[cfg(feature = "openai")]
pub(crate) mod openai;
#[cfg(feature = "vllm")]
pub(crate) mod vllm;
