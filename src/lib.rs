//! # anyllm
//!
//! A unified chat completion interface over heterogeneous LLM
//! backends. One request shape in, one normalized response shape out,
//! regardless of which vendor served the call.
//!
//! Models are addressed as `"provider:model"`:
//!
//! ```rust,no_run
//! use anyllm::{Client, Message, RequestOptions};
//!
//! # async fn demo() -> Result<(), anyllm::LlmError> {
//! let client = Client::new();
//! let response = client
//!     .chat()
//!     .completions()
//!     .create(
//!         "anthropic:claude-sonnet-4-20250514",
//!         &[Message::user("What is an ADT?")],
//!         &RequestOptions::new().with_max_tokens(512),
//!     )
//!     .await?
//!     .into_response()?;
//! println!("{}", response.content_text().unwrap_or_default());
//! # Ok(())
//! # }
//! ```
//!
//! Set `options.stream` to receive a lazy chunk stream instead, or use
//! [`Client::run_parallel`] to fan the same request out to several
//! models at once. A sync variant of the whole surface lives in
//! [`blocking`].
//!
//! ## Providers
//!
//! Built-in providers are feature-gated and all enabled by default:
//! `openai`, `anthropic`, `groq`, `ollama`, `vllm`. Adapters are
//! constructed lazily on first use from the per-provider
//! [`ProviderConfig`] (falling back to the provider's conventional
//! environment variables) and cached for the client's lifetime;
//! [`Client::configure`] swaps in freshly constructed adapters for the
//! keys it names.

pub mod blocking;
mod client;
mod config;
pub mod error;
mod fanout;
mod model_id;
mod options;
mod provider;
mod providers;
pub mod registry;
mod stream;
mod types;
mod utils;

pub use client::{Chat, ChatCompletion, Client, Completions};
pub use config::ProviderConfig;
pub use error::LlmError;
pub use model_id::ModelId;
pub use options::RequestOptions;
pub use provider::ProviderAdapter;
pub use registry::{ProviderRegistry, supported_providers};
pub use stream::ChatCompletionStream;
pub use types::{ChatCompletionResponse, Choice, Message, Role, Usage};

/// Convenience re-exports for glob import.
pub mod prelude {
    pub use crate::{
        ChatCompletion, ChatCompletionResponse, ChatCompletionStream, Choice, Client, LlmError,
        Message, ModelId, ProviderConfig, RequestOptions, Role, Usage, supported_providers,
    };
}
