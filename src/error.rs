//! Error types for the dispatch layer.
//!
//! One `LlmError` enum covers routing, construction, and request
//! failures. The façade and registry never swallow adapter errors;
//! they only wrap them with routing context (`ProviderRequest`,
//! `AdapterConstruction`) before re-raising.

use thiserror::Error;

/// Unified error type surfaced to callers.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The model string lacks the `provider:model` separator.
    #[error("invalid model format: expected 'provider:model', got '{0}'")]
    InvalidModelFormat(String),

    /// The provider key is not in the registered set.
    #[error("unsupported provider '{provider}'; supported providers: {}", .supported.join(", "))]
    UnsupportedProvider {
        provider: String,
        supported: Vec<String>,
    },

    /// Adapter construction failed because no credential was supplied.
    #[error("missing credential for provider '{provider}': {message}")]
    MissingCredential { provider: String, message: String },

    /// Adapter construction failed because no endpoint was supplied.
    #[error("missing endpoint for provider '{provider}': {message}")]
    MissingEndpoint { provider: String, message: String },

    /// Any other failure raised while instantiating an adapter.
    #[error("failed to construct adapter for provider '{provider}': {source}")]
    AdapterConstruction {
        provider: String,
        #[source]
        source: Box<LlmError>,
    },

    /// A vendor call failed; carries the provider/model routing context
    /// added by the façade on the way out.
    #[error("provider '{provider}' request for model '{model}' failed: {source}")]
    ProviderRequest {
        provider: String,
        model: String,
        #[source]
        source: Box<LlmError>,
    },

    /// Transport-level failure (connectivity, timeout, TLS).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Non-success status returned by the vendor API.
    #[error("API error {code}: {message}")]
    ApiError {
        code: u16,
        message: String,
        details: Option<serde_json::Value>,
    },

    /// The vendor response could not be decoded.
    #[error("failed to parse provider response: {0}")]
    ParseError(String),

    /// A streaming response failed mid-flight.
    #[error("stream error: {0}")]
    StreamError(String),

    /// The operation is not supported by the addressed adapter.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Invariant violation inside the library (poisoned lock, join failure).
    #[error("internal error: {0}")]
    InternalError(String),
}

impl LlmError {
    /// Shorthand for an `ApiError` without structured details.
    pub fn api_error(code: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Attach provider/model routing context to a request-path error.
    ///
    /// Routing and construction errors already carry their context and
    /// pass through unchanged.
    pub(crate) fn with_route(self, provider: &str, model: &str) -> Self {
        match self {
            err @ (Self::InvalidModelFormat(_)
            | Self::UnsupportedProvider { .. }
            | Self::MissingCredential { .. }
            | Self::MissingEndpoint { .. }
            | Self::AdapterConstruction { .. }
            | Self::ProviderRequest { .. }) => err,
            other => Self::ProviderRequest {
                provider: provider.to_string(),
                model: model.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Whether this error originated in a vendor request (as opposed to
    /// routing or configuration).
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            Self::ProviderRequest { .. }
                | Self::HttpError(_)
                | Self::ApiError { .. }
                | Self::ParseError(_)
                | Self::StreamError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_provider_message_lists_the_set() {
        let err = LlmError::UnsupportedProvider {
            provider: "doesnotexist".to_string(),
            supported: vec!["anthropic".to_string(), "openai".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("doesnotexist"));
        assert!(msg.contains("anthropic, openai"));
    }

    #[test]
    fn with_route_wraps_request_errors_only() {
        let wrapped = LlmError::api_error(429, "slow down").with_route("openai", "gpt-4o");
        assert!(matches!(wrapped, LlmError::ProviderRequest { .. }));
        assert!(wrapped.is_request_error());

        let routing = LlmError::InvalidModelFormat("gpt-4o".to_string());
        assert!(matches!(
            routing.with_route("openai", "gpt-4o"),
            LlmError::InvalidModelFormat(_)
        ));
    }

    #[test]
    fn routed_errors_are_not_double_wrapped() {
        let once = LlmError::HttpError("boom".to_string()).with_route("openai", "gpt-4o");
        let twice = once.with_route("openai", "gpt-4o");
        match twice {
            LlmError::ProviderRequest { source, .. } => {
                assert!(matches!(*source, LlmError::HttpError(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
