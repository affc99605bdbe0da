//! Streaming response type.

use std::pin::Pin;

use futures::Stream;

use crate::error::LlmError;
use crate::types::ChatCompletionResponse;

/// A lazy, pull-based sequence of streaming chunks.
///
/// Finite and not restartable; chunks arrive in vendor emission order.
/// Dropping the stream cancels the underlying request and releases the
/// connection without waiting for natural completion.
pub type ChatCompletionStream =
    Pin<Box<dyn Stream<Item = Result<ChatCompletionResponse, LlmError>> + Send>>;
