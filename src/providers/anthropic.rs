//! Anthropic provider (native Messages API).
//!
//! The wire format differs from the OpenAI family in three ways that
//! matter for normalization: system prompts travel in a top-level
//! `system` field, assistant output arrives as a list of content
//! blocks, and usage is reported as `input_tokens`/`output_tokens`.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use crate::config::ProviderConfig;
use crate::error::LlmError;
use crate::options::RequestOptions;
use crate::provider::ProviderAdapter;
use crate::stream::ChatCompletionStream;
use crate::types::{ChatCompletionResponse, Choice, Message, Role, Usage};
use crate::utils::streaming::{SseEventConverter, StreamFactory};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
// The Messages API requires max_tokens; used when the caller sets none.
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub(crate) fn build_adapter(config: &ProviderConfig) -> Result<Arc<dyn ProviderAdapter>, LlmError> {
    Ok(Arc::new(AnthropicAdapter::from_config(config)?))
}

pub(crate) struct AnthropicAdapter {
    api_key: SecretString,
    base_url: String,
    http: reqwest::Client,
}

impl AnthropicAdapter {
    pub(crate) fn from_config(config: &ProviderConfig) -> Result<Self, LlmError> {
        let api_key = match &config.api_key {
            Some(key) => key.clone(),
            None => std::env::var("ANTHROPIC_API_KEY")
                .map(SecretString::from)
                .map_err(|_| LlmError::MissingCredential {
                    provider: "anthropic".to_string(),
                    message: "provide api_key in the provider config or set ANTHROPIC_API_KEY"
                        .to_string(),
                })?,
        };
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let http = crate::utils::build_http_client(config.timeout)?;
        tracing::debug!(provider = "anthropic", %base_url, "constructed adapter");

        Ok(Self {
            api_key,
            base_url,
            http,
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }

    fn build_body(
        &self,
        model: &str,
        messages: &[Message],
        options: &RequestOptions,
        stream: bool,
    ) -> serde_json::Value {
        let mut system_parts: Vec<&str> = Vec::new();
        let mut wire_messages: Vec<serde_json::Value> = Vec::new();
        for message in messages {
            match message.role {
                Role::System => system_parts.push(&message.content),
                Role::Assistant => {
                    wire_messages.push(json!({"role": "assistant", "content": message.content}));
                }
                // Tool results are forwarded as user turns.
                Role::User | Role::Tool => {
                    wire_messages.push(json!({"role": "user", "content": message.content}));
                }
            }
        }

        let mut map = serde_json::Map::new();
        map.insert(
            "max_tokens".to_string(),
            options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS).into(),
        );
        if !system_parts.is_empty() {
            map.insert("system".to_string(), system_parts.join("\n").into());
        }
        if let Some(temperature) = options.temperature {
            map.insert("temperature".to_string(), temperature.into());
        }
        if let Some(top_p) = options.top_p {
            map.insert("top_p".to_string(), top_p.into());
        }
        if let Some(stop) = &options.stop {
            map.insert("stop_sequences".to_string(), stop.clone().into());
        }
        // Vendor-specific knobs first so they cannot clobber routing keys.
        for (key, value) in &options.extra {
            map.insert(key.clone(), value.clone());
        }
        map.insert("model".to_string(), model.into());
        map.insert("messages".to_string(), wire_messages.into());
        if stream {
            map.insert("stream".to_string(), true.into());
        }
        serde_json::Value::Object(map)
    }

    fn request(&self, body: &serde_json::Value) -> reqwest::RequestBuilder {
        self.http
            .post(self.messages_url())
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(body)
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn provider_id(&self) -> &str {
        "anthropic"
    }

    async fn chat_completions_create(
        &self,
        model: &str,
        messages: &[Message],
        options: &RequestOptions,
    ) -> Result<ChatCompletionResponse, LlmError> {
        let body = self.build_body(model, messages, options, false);
        tracing::debug!(provider = "anthropic", model, "dispatching chat completion");

        let response = self
            .request(&body)
            .send()
            .await
            .map_err(|e| LlmError::HttpError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(crate::utils::api_error_from_body(
                response.status().as_u16(),
                &response.text().await.unwrap_or_default(),
            ));
        }

        let raw: WireMessageResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(format!("failed to decode response: {e}")))?;
        Ok(normalize_response(raw))
    }

    async fn chat_completions_create_stream(
        &self,
        model: &str,
        messages: &[Message],
        options: &RequestOptions,
    ) -> Result<ChatCompletionStream, LlmError> {
        let body = self.build_body(model, messages, options, true);
        tracing::debug!(provider = "anthropic", model, "dispatching streaming chat completion");
        StreamFactory::create_eventsource_stream(self.request(&body), AnthropicEventConverter)
            .await
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WireMessageResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    content: Vec<WireContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    input_tokens: Option<u32>,
    #[serde(default)]
    output_tokens: Option<u32>,
}

fn map_stop_reason(stop_reason: Option<&str>) -> Option<String> {
    match stop_reason {
        Some("end_turn") | Some("stop_sequence") => Some("stop".to_string()),
        Some("max_tokens") => Some("length".to_string()),
        Some("tool_use") => Some("tool_calls".to_string()),
        Some(other) => Some(other.to_string()),
        None => None,
    }
}

fn normalize_response(raw: WireMessageResponse) -> ChatCompletionResponse {
    let text: String = raw
        .content
        .iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text.as_deref())
        .collect();

    ChatCompletionResponse {
        choices: vec![Choice {
            index: 0,
            message: Message::assistant(text),
            finish_reason: map_stop_reason(raw.stop_reason.as_deref()),
            delta: None,
        }],
        model: raw.model.unwrap_or_default(),
        created: ChatCompletionResponse::now_timestamp(),
        usage: raw.usage.map(|u| {
            let prompt = u.input_tokens.unwrap_or(0);
            let completion = u.output_tokens.unwrap_or(0);
            Usage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: prompt + completion,
            }
        }),
    }
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

/// One SSE event of the Messages stream, discriminated by `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum WireStreamEvent {
    #[serde(rename = "message_start")]
    MessageStart,
    #[serde(rename = "content_block_start")]
    ContentBlockStart,
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta { delta: WireDelta },
    #[serde(rename = "content_block_stop")]
    ContentBlockStop,
    #[serde(rename = "message_delta")]
    MessageDelta {
        #[serde(default)]
        delta: Option<WireMessageDelta>,
    },
    #[serde(rename = "message_stop")]
    MessageStop,
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        error: Option<serde_json::Value>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct WireDelta {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMessageDelta {
    #[serde(default)]
    stop_reason: Option<String>,
}

fn delta_chunk(content: String, finish_reason: Option<String>) -> ChatCompletionResponse {
    let delta = Message::assistant(content);
    ChatCompletionResponse {
        choices: vec![Choice {
            index: 0,
            message: delta.clone(),
            finish_reason,
            delta: Some(delta),
        }],
        model: String::new(),
        created: ChatCompletionResponse::now_timestamp(),
        usage: None,
    }
}

struct AnthropicEventConverter;

impl SseEventConverter for AnthropicEventConverter {
    fn convert_event(
        &self,
        event: eventsource_stream::Event,
    ) -> Vec<Result<ChatCompletionResponse, LlmError>> {
        let parsed: WireStreamEvent = match serde_json::from_str(&event.data) {
            Ok(parsed) => parsed,
            Err(e) => {
                return vec![Err(LlmError::ParseError(format!(
                    "failed to parse stream event: {e}"
                )))];
            }
        };

        match parsed {
            WireStreamEvent::ContentBlockDelta { delta } if delta.kind == "text_delta" => {
                vec![Ok(delta_chunk(delta.text.unwrap_or_default(), None))]
            }
            WireStreamEvent::MessageDelta { delta } => {
                let finish_reason =
                    map_stop_reason(delta.and_then(|d| d.stop_reason).as_deref());
                vec![Ok(delta_chunk(String::new(), finish_reason))]
            }
            WireStreamEvent::Error { error } => {
                let message = error
                    .as_ref()
                    .and_then(|v| v["message"].as_str())
                    .unwrap_or("vendor reported a stream error")
                    .to_string();
                vec![Err(LlmError::StreamError(message))]
            }
            // message_start/stop, block boundaries, and pings carry no
            // content at this layer.
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_blocks_flatten_into_one_message() {
        let raw: WireMessageResponse = serde_json::from_str(
            r#"{"model":"claude-3-5-sonnet",
                "content":[{"type":"text","text":"hello "},{"type":"text","text":"there"}],
                "stop_reason":"end_turn",
                "usage":{"input_tokens":10,"output_tokens":4}}"#,
        )
        .unwrap();
        let resp = normalize_response(raw);
        assert_eq!(resp.content_text(), Some("hello there"));
        assert_eq!(resp.finish_reason(), Some("stop"));
        assert_eq!(
            resp.usage,
            Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 4,
                total_tokens: 14
            })
        );
    }

    #[test]
    fn missing_usage_stays_absent() {
        let raw: WireMessageResponse =
            serde_json::from_str(r#"{"content":[{"type":"text","text":"hi"}]}"#).unwrap();
        assert!(normalize_response(raw).usage.is_none());
    }

    #[test]
    fn system_messages_move_to_the_system_field() {
        let adapter = AnthropicAdapter::from_config(
            &ProviderConfig::new().with_api_key("sk-ant-test"),
        )
        .unwrap();
        let body = adapter.build_body(
            "claude-3-5-sonnet",
            &[
                Message::system("be brief"),
                Message::user("hi"),
                Message::assistant("hello"),
            ],
            &RequestOptions::new(),
            false,
        );
        assert_eq!(body["system"], "be brief");
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(body["max_tokens"], DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn stream_events_convert_to_delta_chunks() {
        let converter = AnthropicEventConverter;
        let event = eventsource_stream::Event {
            event: String::new(),
            data: r#"{"type":"content_block_delta","index":0,
                      "delta":{"type":"text_delta","text":"Hel"}}"#
                .to_string(),
            id: String::new(),
            retry: None,
        };
        let chunks = converter.convert_event(event);
        assert_eq!(chunks.len(), 1);
        let chunk = chunks[0].as_ref().unwrap();
        assert_eq!(chunk.choices[0].delta.as_ref().unwrap().content, "Hel");
        assert!(chunk.usage.is_none());

        let ping = eventsource_stream::Event {
            event: String::new(),
            data: r#"{"type":"ping"}"#.to_string(),
            id: String::new(),
            retry: None,
        };
        assert!(converter.convert_event(ping).is_empty());
    }

    #[test]
    fn vendor_stream_errors_surface_as_err_items() {
        let converter = AnthropicEventConverter;
        let event = eventsource_stream::Event {
            event: String::new(),
            data: r#"{"type":"error","error":{"type":"overloaded_error","message":"overloaded"}}"#
                .to_string(),
            id: String::new(),
            retry: None,
        };
        let items = converter.convert_event(event);
        assert_eq!(items.len(), 1);
        match items[0].as_ref().err().unwrap() {
            LlmError::StreamError(message) => assert_eq!(message, "overloaded"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_credential_is_fail_fast() {
        // Only meaningful when the environment does not provide a key.
        if std::env::var("ANTHROPIC_API_KEY").is_ok() {
            return;
        }
        let err = AnthropicAdapter::from_config(&ProviderConfig::new())
            .err()
            .unwrap();
        assert!(matches!(err, LlmError::MissingCredential { .. }));
    }
}
