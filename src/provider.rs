//! The capability interface every vendor adapter implements.
//!
//! Nothing outside `providers/` knows vendor detail beyond this trait.

use async_trait::async_trait;

use crate::error::LlmError;
use crate::options::RequestOptions;
use crate::stream::ChatCompletionStream;
use crate::types::{ChatCompletionResponse, Message};

/// One long-lived adapter per (client, provider key).
///
/// Adapters own their connection resources (an HTTP client) and are
/// constructed fail-fast: configuration mistakes (missing credential or
/// endpoint) surface at construction, never at first call.
///
/// Normalization contract: the vendor-native response maps into
/// [`ChatCompletionResponse`] with `choices[0].message.content`
/// populated for the common single-choice case; multi-choice vendors
/// populate all entries in order with stable `index`. Usage is absent
/// when the vendor does not report it, never fabricated. Streaming
/// chunks set `delta` and mirror it into `message`; usage is reported
/// only on non-streaming terminal responses.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// The registry key this adapter serves.
    fn provider_id(&self) -> &str;

    /// Non-streaming chat completion.
    ///
    /// `model` arrives with the provider prefix already stripped;
    /// `options.extra` is forwarded verbatim to the vendor.
    async fn chat_completions_create(
        &self,
        model: &str,
        messages: &[Message],
        options: &RequestOptions,
    ) -> Result<ChatCompletionResponse, LlmError>;

    /// Streaming chat completion. Chunks are yielded in vendor emission
    /// order; dropping the stream cancels the request.
    async fn chat_completions_create_stream(
        &self,
        model: &str,
        messages: &[Message],
        options: &RequestOptions,
    ) -> Result<ChatCompletionStream, LlmError>;

    /// Release any held connection/session resource. Idempotent; the
    /// default is a no-op for adapters whose resources release on drop.
    async fn close(&self) {}
}
