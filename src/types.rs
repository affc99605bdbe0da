//! Canonical chat completion types.
//!
//! Every adapter normalizes its vendor's native response into
//! [`ChatCompletionResponse`] so callers read one shape regardless of
//! which backend served the request.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Role of a chat message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    #[default]
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        f.write_str(s)
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    /// Legacy single-function call payload, forwarded opaquely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<serde_json::Value>,
    /// Tool call payloads, forwarded opaquely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<serde_json::Value>>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            ..Default::default()
        }
    }
}

/// One completion choice.
///
/// For streaming chunks `delta` carries the increment and `message`
/// mirrors it, so callers have a single field to read in both modes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub message: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<Message>,
}

/// Token accounting reported by the vendor.
///
/// Never fabricated: adapters only populate this from counts the vendor
/// actually reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// The normalized result shape shared by all providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    /// Non-empty by construction; defaults to one placeholder choice.
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub model: String,
    /// Unix timestamp; the vendor's when reported, otherwise stamped at
    /// normalization time.
    #[serde(default)]
    pub created: i64,
    /// Present only on non-streaming terminal responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl Default for ChatCompletionResponse {
    fn default() -> Self {
        Self {
            choices: vec![Choice::default()],
            model: String::new(),
            created: 0,
            usage: None,
        }
    }
}

impl ChatCompletionResponse {
    /// Convenience accessor for the common single-choice case.
    pub fn content_text(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }

    /// First choice's finish reason, if any.
    pub fn finish_reason(&self) -> Option<&str> {
        self.choices.first()?.finish_reason.as_deref()
    }

    pub(crate) fn now_timestamp() -> i64 {
        Utc::now().timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_response_has_one_placeholder_choice() {
        let resp = ChatCompletionResponse::default();
        assert_eq!(resp.choices.len(), 1);
        assert_eq!(resp.content_text(), Some(""));
        assert!(resp.usage.is_none());
    }

    #[test]
    fn role_serializes_lowercase() {
        let msg = Message::assistant("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "hi");
        assert!(json.get("tool_calls").is_none());
    }
}
