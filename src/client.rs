//! Asynchronous client façade.
//!
//! The single entry point mirrors the `chat.completions.create` shape:
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
//!         "openai:gpt-4o",
//!         &[Message::user("hello")],
//!         &RequestOptions::new(),
//!     )
//!     .await?
//!     .into_response()?;
//! println!("{}", response.content_text().unwrap_or_default());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::StreamExt;

use crate::config::ProviderConfig;
use crate::error::LlmError;
use crate::model_id::ModelId;
use crate::options::RequestOptions;
use crate::registry::{self, ProviderRegistry};
use crate::stream::ChatCompletionStream;
use crate::types::{ChatCompletionResponse, Message};

/// Outcome of a `create` call: a terminal response, or a lazy chunk
/// stream iff `options.stream` was set.
pub enum ChatCompletion {
    Response(ChatCompletionResponse),
    Stream(ChatCompletionStream),
}

impl ChatCompletion {
    /// Unwrap the terminal response of a non-streaming call.
    pub fn into_response(self) -> Result<ChatCompletionResponse, LlmError> {
        match self {
            Self::Response(response) => Ok(response),
            Self::Stream(_) => Err(LlmError::UnsupportedOperation(
                "call returned a stream; read it with into_stream()".to_string(),
            )),
        }
    }

    /// Unwrap the chunk stream of a streaming call.
    pub fn into_stream(self) -> Result<ChatCompletionStream, LlmError> {
        match self {
            Self::Stream(stream) => Ok(stream),
            Self::Response(_) => Err(LlmError::UnsupportedOperation(
                "call returned a terminal response; read it with into_response()".to_string(),
            )),
        }
    }
}

/// Asynchronous client for heterogeneous LLM backends.
///
/// Cheap to clone; clones share one adapter cache. Each client owns its
/// registry (nothing is process-global) and its lifecycle ends with
/// [`Client::close`].
#[derive(Clone)]
pub struct Client {
    registry: Arc<ProviderRegistry>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// A client with no provider configuration; adapters constructed on
    /// first use fall back to their environment variables.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(ProviderRegistry::default()),
        }
    }

    /// A client with per-provider configuration. Keys are validated
    /// here; adapters are constructed lazily on first use.
    pub fn with_configs(configs: HashMap<String, ProviderConfig>) -> Result<Self, LlmError> {
        Ok(Self {
            registry: Arc::new(ProviderRegistry::new(configs)?),
        })
    }

    /// Merge configuration and eagerly swap in fresh adapters for every
    /// key present in `configs`. In-flight calls against replaced
    /// adapters drain; new calls pick up the fresh instances.
    pub fn configure(&self, configs: HashMap<String, ProviderConfig>) -> Result<(), LlmError> {
        self.registry.configure(configs)
    }

    /// The chat API group.
    pub fn chat(&self) -> Chat<'_> {
        Chat { client: self }
    }

    /// Close every cached adapter and release held resources.
    pub async fn close(&self) {
        self.registry.close().await;
    }

    pub(crate) fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }
}

/// `client.chat()` API group.
pub struct Chat<'a> {
    client: &'a Client,
}

impl<'a> Chat<'a> {
    pub fn completions(&self) -> Completions<'a> {
        Completions {
            client: self.client,
        }
    }
}

/// `client.chat().completions()` API group.
pub struct Completions<'a> {
    client: &'a Client,
}

impl Completions<'_> {
    /// Route `model` (`"provider:model"`) to its adapter and dispatch.
    ///
    /// The façade interprets only the routing key and `options.stream`;
    /// everything else is forwarded to the adapter verbatim. Adapter
    /// request failures come back wrapped with the provider/model
    /// routing context, never swallowed.
    pub async fn create(
        &self,
        model: &str,
        messages: &[Message],
        options: &RequestOptions,
    ) -> Result<ChatCompletion, LlmError> {
        let id = ModelId::parse(model)?;

        let supported = registry::supported_providers();
        if !supported.iter().any(|p| *p == id.provider()) {
            return Err(LlmError::UnsupportedProvider {
                provider: id.provider().to_string(),
                supported: supported.iter().map(|s| s.to_string()).collect(),
            });
        }

        let adapter = self.client.registry().resolve(id.provider()).await?;

        if options.stream {
            let stream = adapter
                .chat_completions_create_stream(id.model(), messages, options)
                .await
                .map_err(|e| e.with_route(id.provider(), id.model()))?;
            let provider = id.provider().to_string();
            let model_name = id.model().to_string();
            let routed: ChatCompletionStream = Box::pin(stream.map(move |item| {
                item.map_err(|e| e.with_route(&provider, &model_name))
            }));
            Ok(ChatCompletion::Stream(routed))
        } else {
            let response = adapter
                .chat_completions_create(id.model(), messages, options)
                .await
                .map_err(|e| e.with_route(id.provider(), id.model()))?;
            Ok(ChatCompletion::Response(response))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::mock;

    fn mock_client() -> Client {
        Client::new()
    }

    #[tokio::test]
    async fn malformed_model_fails_before_dispatch() {
        let client = mock_client();
        let err = client
            .chat()
            .completions()
            .create("gpt-4o", &[Message::user("hi")], &RequestOptions::new())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, LlmError::InvalidModelFormat(_)));
    }

    #[tokio::test]
    async fn unknown_provider_error_lists_the_supported_set() {
        let client = mock_client();
        let err = client
            .chat()
            .completions()
            .create(
                "doesnotexist:some-model",
                &[Message::user("hi")],
                &RequestOptions::new(),
            )
            .await
            .err()
            .unwrap();
        let message = err.to_string();
        assert!(message.contains("doesnotexist"));
        assert!(message.contains(mock::PROVIDER_ID));
    }

    #[tokio::test]
    async fn non_streaming_call_returns_usage() {
        let client = mock_client();
        let response = client
            .chat()
            .completions()
            .create(
                "mockprov:any-model",
                &[Message::user("hi")],
                &RequestOptions::new(),
            )
            .await
            .unwrap()
            .into_response()
            .unwrap();
        assert_eq!(response.content_text(), Some("hello back"));
        assert_eq!(response.model, "any-model");
        let usage = response.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 5);
        assert_eq!(usage.completion_tokens, 7);
        assert_eq!(usage.total_tokens, 12);
    }

    #[tokio::test]
    async fn streaming_call_yields_ordered_deltas_without_usage() {
        let client = mock_client();
        let mut stream = client
            .chat()
            .completions()
            .create(
                "mockprov:any-model",
                &[Message::user("hi")],
                &RequestOptions::new().with_stream(true),
            )
            .await
            .unwrap()
            .into_stream()
            .unwrap();

        let mut parts = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();
            assert!(chunk.usage.is_none());
            let choice = &chunk.choices[0];
            let delta = choice.delta.as_ref().expect("chunk without delta");
            assert_eq!(choice.message, *delta);
            parts.push(delta.content.clone());
        }
        assert_eq!(parts, vec!["Hel", "lo", "!"]);
    }

    #[tokio::test]
    async fn adapter_failures_carry_routing_context() {
        let client = mock_client();
        let err = client
            .chat()
            .completions()
            .create(
                "mockprov:boom",
                &[Message::user("hi")],
                &RequestOptions::new(),
            )
            .await
            .err()
            .unwrap();
        match err {
            LlmError::ProviderRequest {
                provider,
                model,
                source,
            } => {
                assert_eq!(provider, mock::PROVIDER_ID);
                assert_eq!(model, "boom");
                assert!(matches!(*source, LlmError::ApiError { code: 500, .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn reconfigured_client_serves_the_fresh_adapter() {
        let client = mock_client();
        let before = client
            .chat()
            .completions()
            .create(
                "mockprov:m",
                &[Message::user("hi")],
                &RequestOptions::new(),
            )
            .await
            .unwrap()
            .into_response()
            .unwrap();
        assert_eq!(before.content_text(), Some("hello back"));

        let mut configs = HashMap::new();
        configs.insert(
            mock::PROVIDER_ID.to_string(),
            ProviderConfig::new().with_extra("reply", "fresh"),
        );
        client.configure(configs).unwrap();

        let after = client
            .chat()
            .completions()
            .create(
                "mockprov:m",
                &[Message::user("hi")],
                &RequestOptions::new(),
            )
            .await
            .unwrap()
            .into_response()
            .unwrap();
        assert_eq!(after.content_text(), Some("fresh"));
    }
}
