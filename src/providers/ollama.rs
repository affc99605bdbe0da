//! Ollama provider (local endpoint, NDJSON streaming).
//!
//! No credential is involved; the endpoint resolves from config,
//! `OLLAMA_API_URL`, or the conventional localhost default. Sampling
//! options travel nested under `options` on this wire, and streaming is
//! newline-delimited JSON rather than SSE.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::config::ProviderConfig;
use crate::error::LlmError;
use crate::options::RequestOptions;
use crate::provider::ProviderAdapter;
use crate::stream::ChatCompletionStream;
use crate::types::{ChatCompletionResponse, Choice, Message, Usage};
use crate::utils::streaming::{JsonLineConverter, StreamFactory};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

pub(crate) fn build_adapter(config: &ProviderConfig) -> Result<Arc<dyn ProviderAdapter>, LlmError> {
    Ok(Arc::new(OllamaAdapter::from_config(config)?))
}

pub(crate) struct OllamaAdapter {
    base_url: String,
    http: reqwest::Client,
}

impl OllamaAdapter {
    pub(crate) fn from_config(config: &ProviderConfig) -> Result<Self, LlmError> {
        let base_url = config
            .base_url
            .clone()
            .or_else(|| std::env::var("OLLAMA_API_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let http = crate::utils::build_http_client(config.timeout)?;
        tracing::debug!(provider = "ollama", %base_url, "constructed adapter");

        Ok(Self { base_url, http })
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }

    fn build_body(
        &self,
        model: &str,
        messages: &[Message],
        options: &RequestOptions,
        stream: bool,
    ) -> serde_json::Value {
        let wire_messages: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| json!({"role": m.role.to_string(), "content": m.content}))
            .collect();

        let mut sampling = serde_json::Map::new();
        if let Some(temperature) = options.temperature {
            sampling.insert("temperature".to_string(), temperature.into());
        }
        if let Some(top_p) = options.top_p {
            sampling.insert("top_p".to_string(), top_p.into());
        }
        if let Some(max_tokens) = options.max_tokens {
            sampling.insert("num_predict".to_string(), max_tokens.into());
        }
        if let Some(stop) = &options.stop {
            sampling.insert("stop".to_string(), stop.clone().into());
        }

        let mut map = serde_json::Map::new();
        if !sampling.is_empty() {
            map.insert("options".to_string(), sampling.into());
        }
        // Vendor-specific knobs first so they cannot clobber routing keys.
        for (key, value) in &options.extra {
            map.insert(key.clone(), value.clone());
        }
        map.insert("model".to_string(), model.into());
        map.insert("messages".to_string(), wire_messages.into());
        map.insert("stream".to_string(), stream.into());
        serde_json::Value::Object(map)
    }
}

#[async_trait]
impl ProviderAdapter for OllamaAdapter {
    fn provider_id(&self) -> &str {
        "ollama"
    }

    async fn chat_completions_create(
        &self,
        model: &str,
        messages: &[Message],
        options: &RequestOptions,
    ) -> Result<ChatCompletionResponse, LlmError> {
        let body = self.build_body(model, messages, options, false);
        tracing::debug!(provider = "ollama", model, "dispatching chat completion");

        let response = self
            .http
            .post(self.chat_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::HttpError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(crate::utils::api_error_from_body(
                response.status().as_u16(),
                &response.text().await.unwrap_or_default(),
            ));
        }

        let raw: WireChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(format!("failed to decode response: {e}")))?;
        Ok(normalize_response(raw, false))
    }

    async fn chat_completions_create_stream(
        &self,
        model: &str,
        messages: &[Message],
        options: &RequestOptions,
    ) -> Result<ChatCompletionStream, LlmError> {
        let body = self.build_body(model, messages, options, true);
        tracing::debug!(provider = "ollama", model, "dispatching streaming chat completion");

        let request = self.http.post(self.chat_url()).json(&body);
        StreamFactory::create_json_lines_stream(request, OllamaLineConverter).await
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WireChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    message: Option<WireChatMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WireChatMessage {
    #[serde(default)]
    content: String,
}

fn normalize_response(raw: WireChatResponse, streaming: bool) -> ChatCompletionResponse {
    let content = raw.message.map(|m| m.content).unwrap_or_default();
    let message = Message::assistant(content);
    let finish_reason = if raw.done {
        Some(raw.done_reason.unwrap_or_else(|| "stop".to_string()))
    } else {
        None
    };

    let usage = if streaming {
        None
    } else {
        match (raw.prompt_eval_count, raw.eval_count) {
            (None, None) => None,
            (prompt, completion) => {
                let prompt = prompt.unwrap_or(0);
                let completion = completion.unwrap_or(0);
                Some(Usage {
                    prompt_tokens: prompt,
                    completion_tokens: completion,
                    total_tokens: prompt + completion,
                })
            }
        }
    };

    ChatCompletionResponse {
        choices: vec![Choice {
            index: 0,
            message: message.clone(),
            finish_reason,
            delta: streaming.then_some(message),
        }],
        model: raw.model.unwrap_or_default(),
        created: ChatCompletionResponse::now_timestamp(),
        usage,
    }
}

struct OllamaLineConverter;

impl JsonLineConverter for OllamaLineConverter {
    fn convert_line(&self, line: &str) -> Vec<Result<ChatCompletionResponse, LlmError>> {
        match serde_json::from_str::<WireChatResponse>(line) {
            Ok(raw) => vec![Ok(normalize_response(raw, true))],
            Err(e) => vec![Err(LlmError::ParseError(format!(
                "failed to parse stream line: {e}"
            )))],
        }
    }

    fn is_done(&self, line: &str) -> bool {
        serde_json::from_str::<WireChatResponse>(line)
            .map(|raw| raw.done)
            .unwrap_or(false)
    }
}
