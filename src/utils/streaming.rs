//! Common streaming utilities.
//!
//! Providers differ only in how a wire chunk maps to a canonical
//! response; the SSE/NDJSON plumbing here is shared. SSE parsing is
//! delegated to `eventsource-stream`, which handles UTF-8 boundaries
//! and line buffering across network chunks.

use async_stream::stream;
use eventsource_stream::{Event, Eventsource};
use futures_util::StreamExt;

use crate::error::LlmError;
use crate::stream::ChatCompletionStream;
use crate::types::ChatCompletionResponse;

/// Converts one provider-specific SSE event into zero or more canonical
/// chunks.
pub(crate) trait SseEventConverter: Send + Sync {
    fn convert_event(&self, event: Event) -> Vec<Result<ChatCompletionResponse, LlmError>>;

    /// Called when the vendor signals end of stream (`[DONE]`).
    fn handle_stream_end(&self) -> Option<Result<ChatCompletionResponse, LlmError>> {
        None
    }
}

/// Converts one NDJSON line into zero or more canonical chunks, and
/// reports whether that line was the vendor's terminal marker.
pub(crate) trait JsonLineConverter: Send + Sync {
    fn convert_line(&self, line: &str) -> Vec<Result<ChatCompletionResponse, LlmError>>;

    fn is_done(&self, line: &str) -> bool;
}

/// Factory for provider chunk streams.
pub(crate) struct StreamFactory;

impl StreamFactory {
    /// Send the request and expose the SSE response as a canonical
    /// chunk stream.
    pub(crate) async fn create_eventsource_stream<C>(
        request_builder: reqwest::RequestBuilder,
        converter: C,
    ) -> Result<ChatCompletionStream, LlmError>
    where
        C: SseEventConverter + 'static,
    {
        let response = request_builder
            .send()
            .await
            .map_err(|e| LlmError::HttpError(format!("failed to send request: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(crate::utils::api_error_from_body(status.as_u16(), &body));
        }

        let sse_stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other))
            .eventsource();

        let chunk_stream = sse_stream
            .map(move |event_result| match event_result {
                Ok(event) => {
                    if event.data.trim() == "[DONE]" {
                        tracing::debug!("stream terminated by [DONE]");
                        match converter.handle_stream_end() {
                            Some(end) => vec![end],
                            None => vec![],
                        }
                    } else if event.data.trim().is_empty() {
                        vec![]
                    } else {
                        converter.convert_event(event)
                    }
                }
                Err(e) => vec![Err(LlmError::StreamError(format!("SSE parsing error: {e}")))],
            })
            .flat_map(futures::stream::iter);

        Ok(Box::pin(chunk_stream))
    }

    /// Send the request and expose a newline-delimited JSON response as
    /// a canonical chunk stream. Lines are reassembled across network
    /// chunk boundaries before conversion.
    pub(crate) async fn create_json_lines_stream<C>(
        request_builder: reqwest::RequestBuilder,
        converter: C,
    ) -> Result<ChatCompletionStream, LlmError>
    where
        C: JsonLineConverter + 'static,
    {
        let response = request_builder
            .send()
            .await
            .map_err(|e| LlmError::HttpError(format!("failed to send request: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(crate::utils::api_error_from_body(status.as_u16(), &body));
        }

        let mut byte_stream = response.bytes_stream();

        let chunk_stream = stream! {
            let mut buffer: Vec<u8> = Vec::new();
            'outer: while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(LlmError::StreamError(format!("stream error: {e}")));
                        break;
                    }
                };
                buffer.extend_from_slice(&chunk);
                while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                    let line_bytes: Vec<u8> = buffer.drain(..=pos).collect();
                    let line = String::from_utf8_lossy(&line_bytes);
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let done = converter.is_done(line);
                    for item in converter.convert_line(line) {
                        yield item;
                    }
                    if done {
                        tracing::debug!("NDJSON stream reported done");
                        break 'outer;
                    }
                }
            }
            // Trailing line without a final newline.
            let tail = String::from_utf8_lossy(&buffer);
            let tail = tail.trim();
            if !tail.is_empty() {
                for item in converter.convert_line(tail) {
                    yield item;
                }
            }
        };

        Ok(Box::pin(chunk_stream))
    }
}
