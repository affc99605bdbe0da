//! Test-only provider wired into the factory table.
//!
//! Behavior is driven by the request: a model named `"boom"` fails, and
//! construction fails when the config sets `fail_construct`, so tests
//! can exercise every error path without network access.

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use async_trait::async_trait;

use crate::config::ProviderConfig;
use crate::error::LlmError;
use crate::options::RequestOptions;
use crate::provider::ProviderAdapter;
use crate::stream::ChatCompletionStream;
use crate::types::{ChatCompletionResponse, Choice, Message, Usage};

pub(crate) const PROVIDER_ID: &str = "mockprov";

/// Incremented on construction only for configs carrying
/// `count_builds`, so tests asserting on it are isolated from tests
/// that merely use the mock provider.
pub(crate) static BUILD_COUNT: AtomicUsize = AtomicUsize::new(0);

pub(crate) fn build_adapter(config: &ProviderConfig) -> Result<Arc<dyn ProviderAdapter>, LlmError> {
    if config
        .extra
        .get("fail_construct")
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
    {
        return Err(LlmError::InternalError(
            "mock adapter construction failed".to_string(),
        ));
    }
    let reply = config
        .extra
        .get("reply")
        .and_then(|v| v.as_str())
        .unwrap_or("hello back")
        .to_string();
    if config
        .extra
        .get("count_builds")
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
    {
        BUILD_COUNT.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
    Ok(Arc::new(MockAdapter { reply }))
}

pub(crate) struct MockAdapter {
    reply: String,
}

const STREAM_PARTS: [&str; 3] = ["Hel", "lo", "!"];

#[async_trait]
impl ProviderAdapter for MockAdapter {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    async fn chat_completions_create(
        &self,
        model: &str,
        _messages: &[Message],
        _options: &RequestOptions,
    ) -> Result<ChatCompletionResponse, LlmError> {
        if model == "boom" {
            return Err(LlmError::api_error(500, "mock request failure"));
        }
        Ok(ChatCompletionResponse {
            choices: vec![Choice {
                index: 0,
                message: Message::assistant(self.reply.clone()),
                finish_reason: Some("stop".to_string()),
                delta: None,
            }],
            model: model.to_string(),
            created: ChatCompletionResponse::now_timestamp(),
            usage: Some(Usage {
                prompt_tokens: 5,
                completion_tokens: 7,
                total_tokens: 12,
            }),
        })
    }

    async fn chat_completions_create_stream(
        &self,
        model: &str,
        _messages: &[Message],
        _options: &RequestOptions,
    ) -> Result<ChatCompletionStream, LlmError> {
        if model == "boom" {
            return Err(LlmError::api_error(500, "mock request failure"));
        }
        let model = model.to_string();
        let last = STREAM_PARTS.len() - 1;
        let chunks: Vec<Result<ChatCompletionResponse, LlmError>> = STREAM_PARTS
            .iter()
            .enumerate()
            .map(|(i, part)| {
                let delta = Message::assistant(*part);
                Ok(ChatCompletionResponse {
                    choices: vec![Choice {
                        index: 0,
                        message: delta.clone(),
                        finish_reason: (i == last).then(|| "stop".to_string()),
                        delta: Some(delta),
                    }],
                    model: model.clone(),
                    created: ChatCompletionResponse::now_timestamp(),
                    usage: None,
                })
            })
            .collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}
