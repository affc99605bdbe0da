//! Shared adapter for providers speaking the OpenAI chat wire format.
//!
//! OpenAI is the protocol family; vendors are presets. Each concrete
//! provider module supplies a [`CompatDefaults`] (id, env vars, default
//! endpoint) and reuses the request building, response normalization,
//! and SSE handling here.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::ProviderConfig;
use crate::error::LlmError;
use crate::options::RequestOptions;
use crate::provider::ProviderAdapter;
use crate::stream::ChatCompletionStream;
use crate::types::{ChatCompletionResponse, Choice, Message, Role, Usage};
use crate::utils::streaming::{SseEventConverter, StreamFactory};

/// Static per-vendor defaults for the OpenAI-compatible family.
pub(crate) struct CompatDefaults {
    pub provider_id: &'static str,
    pub env_api_key: &'static str,
    pub env_base_url: Option<&'static str>,
    pub default_base_url: Option<&'static str>,
}

pub(crate) struct OpenAiCompatibleAdapter {
    provider_id: &'static str,
    api_key: SecretString,
    base_url: String,
    http: reqwest::Client,
}

impl OpenAiCompatibleAdapter {
    /// Fail-fast construction: credential and endpoint must be
    /// resolvable from config or environment, or this returns
    /// `MissingCredential` / `MissingEndpoint` immediately.
    pub(crate) fn from_config(
        defaults: CompatDefaults,
        config: &ProviderConfig,
    ) -> Result<Self, LlmError> {
        let api_key = match &config.api_key {
            Some(key) => key.clone(),
            None => std::env::var(defaults.env_api_key)
                .map(SecretString::from)
                .map_err(|_| LlmError::MissingCredential {
                    provider: defaults.provider_id.to_string(),
                    message: format!(
                        "provide api_key in the provider config or set {}",
                        defaults.env_api_key
                    ),
                })?,
        };

        let base_url = config
            .base_url
            .clone()
            .or_else(|| defaults.env_base_url.and_then(|var| std::env::var(var).ok()))
            .or_else(|| defaults.default_base_url.map(str::to_string))
            .ok_or_else(|| LlmError::MissingEndpoint {
                provider: defaults.provider_id.to_string(),
                message: match defaults.env_base_url {
                    Some(var) => {
                        format!("provide base_url in the provider config or set {var}")
                    }
                    None => "provide base_url in the provider config".to_string(),
                },
            })?;

        let http = crate::utils::build_http_client(config.timeout)?;
        tracing::debug!(provider = defaults.provider_id, %base_url, "constructed adapter");

        Ok(Self {
            provider_id: defaults.provider_id,
            api_key,
            base_url,
            http,
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn build_body(
        &self,
        model: &str,
        messages: &[Message],
        options: &RequestOptions,
        stream: bool,
    ) -> Result<serde_json::Value, LlmError> {
        let mut body = serde_json::to_value(options)
            .map_err(|e| LlmError::InternalError(format!("failed to encode options: {e}")))?;
        let map = body
            .as_object_mut()
            .ok_or_else(|| LlmError::InternalError("options did not encode to an object".into()))?;

        // Vendor-specific knobs first so they cannot clobber routing keys.
        for (key, value) in &options.extra {
            map.insert(key.clone(), value.clone());
        }
        map.insert("model".to_string(), model.into());
        map.insert(
            "messages".to_string(),
            serde_json::to_value(messages)
                .map_err(|e| LlmError::InternalError(format!("failed to encode messages: {e}")))?,
        );
        if stream {
            map.insert("stream".to_string(), true.into());
        }
        Ok(body)
    }

    fn request(&self, body: &serde_json::Value) -> reqwest::RequestBuilder {
        self.http
            .post(self.chat_url())
            .bearer_auth(self.api_key.expose_secret())
            .json(body)
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatibleAdapter {
    fn provider_id(&self) -> &str {
        self.provider_id
    }

    async fn chat_completions_create(
        &self,
        model: &str,
        messages: &[Message],
        options: &RequestOptions,
    ) -> Result<ChatCompletionResponse, LlmError> {
        let body = self.build_body(model, messages, options, false)?;
        tracing::debug!(provider = self.provider_id, model, "dispatching chat completion");

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

        let raw: WireResponse = response
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
        let body = self.build_body(model, messages, options, true)?;
        tracing::debug!(provider = self.provider_id, model, "dispatching streaming chat completion");
        StreamFactory::create_eventsource_stream(self.request(&body), CompatEventConverter).await
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct WireResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub choices: Option<Vec<WireChoice>>,
    #[serde(default)]
    pub usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireChoice {
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(default)]
    pub message: Option<WireMessage>,
    #[serde(default)]
    pub delta: Option<WireMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub function_call: Option<serde_json::Value>,
    #[serde(default)]
    pub tool_calls: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireUsage {
    #[serde(default)]
    pub prompt_tokens: Option<u32>,
    #[serde(default)]
    pub completion_tokens: Option<u32>,
    #[serde(default)]
    pub total_tokens: Option<u32>,
}

fn parse_role(role: Option<&str>) -> Role {
    match role {
        Some("system") => Role::System,
        Some("user") => Role::User,
        Some("tool") => Role::Tool,
        _ => Role::Assistant,
    }
}

fn message_from_wire(wire: WireMessage) -> Message {
    Message {
        role: parse_role(wire.role.as_deref()),
        content: wire.content.unwrap_or_default(),
        function_call: wire.function_call,
        tool_calls: wire.tool_calls,
    }
}

/// Normalize an OpenAI-wire response (terminal or chunk) into the
/// canonical shape.
///
/// Chunk choices carry `delta`; the delta is mirrored into `message`
/// so callers read one field in both modes. Usage is dropped for
/// streaming chunks; it belongs to terminal responses only.
pub(crate) fn normalize_response(raw: WireResponse, streaming: bool) -> ChatCompletionResponse {
    let mut normalized = ChatCompletionResponse {
        model: raw.model.unwrap_or_default(),
        created: raw
            .created
            .unwrap_or_else(ChatCompletionResponse::now_timestamp),
        ..Default::default()
    };

    if let Some(choices) = raw.choices {
        if !choices.is_empty() {
            normalized.choices = choices
                .into_iter()
                .enumerate()
                .map(|(position, choice)| {
                    let index = choice.index.unwrap_or(position as u32);
                    if let Some(delta) = choice.delta {
                        let delta = message_from_wire(delta);
                        Choice {
                            index,
                            message: delta.clone(),
                            finish_reason: choice.finish_reason,
                            delta: Some(delta),
                        }
                    } else {
                        Choice {
                            index,
                            message: choice.message.map(message_from_wire).unwrap_or_default(),
                            finish_reason: choice.finish_reason,
                            delta: None,
                        }
                    }
                })
                .collect();
        }
    }

    if !streaming {
        normalized.usage = raw.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens.unwrap_or(0),
            completion_tokens: u.completion_tokens.unwrap_or(0),
            total_tokens: u.total_tokens.unwrap_or(0),
        });
    }

    normalized
}

struct CompatEventConverter;

impl SseEventConverter for CompatEventConverter {
    fn convert_event(
        &self,
        event: eventsource_stream::Event,
    ) -> Vec<Result<ChatCompletionResponse, LlmError>> {
        match serde_json::from_str::<WireResponse>(&event.data) {
            Ok(raw) => vec![Ok(normalize_response(raw, true))],
            Err(e) => vec![Err(LlmError::ParseError(format!(
                "failed to parse stream event: {e}"
            )))],
        }
    }
}
