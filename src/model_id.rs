//! Model identifier parsing.
//!
//! A model is addressed as `"provider:model"`. The provider segment is
//! the routing key; everything after the first `:` is forwarded to the
//! adapter untouched (model names may themselves contain `:`).

use std::fmt;

use crate::error::LlmError;

/// A parsed `"provider:model"` identifier.
///
/// The provider key is lower-cased and trimmed at parse time so it can
/// be used directly as a registry lookup key. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelId {
    provider: String,
    model: String,
}

impl ModelId {
    /// Parse a raw `"provider:model"` string.
    ///
    /// Fails with [`LlmError::InvalidModelFormat`] only when the `:`
    /// separator is absent. An empty model segment is deliberately
    /// accepted here; whether that is meaningful is the addressed
    /// adapter's concern. An empty provider segment surfaces later as
    /// `UnsupportedProvider`.
    pub fn parse(raw: &str) -> Result<Self, LlmError> {
        let Some((provider, model)) = raw.split_once(':') else {
            return Err(LlmError::InvalidModelFormat(raw.to_string()));
        };
        Ok(Self {
            provider: provider.trim().to_ascii_lowercase(),
            model: model.to_string(),
        })
    }

    /// The normalized provider key.
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// The vendor-side model name (provider prefix stripped).
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.model)
    }
}

impl std::str::FromStr for ModelId {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
