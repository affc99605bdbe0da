//! Shared utilities.

pub mod streaming;

use crate::error::LlmError;

/// Build the per-adapter HTTP client from a configured timeout.
pub(crate) fn build_http_client(
    timeout: Option<std::time::Duration>,
) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(timeout.unwrap_or(std::time::Duration::from_secs(60)))
        .build()
        .map_err(|e| LlmError::HttpError(format!("failed to build HTTP client: {e}")))
}

/// Build an `ApiError` from a non-success vendor response, attaching
/// the structured payload when the body is JSON.
pub(crate) fn api_error_from_body(code: u16, body: &str) -> LlmError {
    let details: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let message = details
        .as_ref()
        .and_then(|v| v["error"]["message"].as_str())
        .unwrap_or(body)
        .to_string();
    LlmError::ApiError {
        code,
        message,
        details,
    }
}
