//! Blocking client façade.
//!
//! Wraps the asynchronous [`Client`](crate::Client) with an owned
//! multi-thread runtime, the same way `reqwest::blocking` wraps its
//! async client. Fan-out work is spawned onto that runtime, so the
//! parallel-worker behavior matches the async façade's.
//!
//! Must not be used from inside an async runtime; driving it there
//! panics in `block_on`.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::runtime::Runtime;

use crate::config::ProviderConfig;
use crate::error::LlmError;
use crate::options::RequestOptions;
use crate::stream::ChatCompletionStream;
use crate::types::{ChatCompletionResponse, Message};

/// Blocking counterpart of [`crate::ChatCompletion`]: the stream
/// variant is an `Iterator` that drives the underlying async stream.
pub enum ChatCompletion {
    Response(ChatCompletionResponse),
    Stream(BlockingStream),
}

impl ChatCompletion {
    pub fn into_response(self) -> Result<ChatCompletionResponse, LlmError> {
        match self {
            Self::Response(response) => Ok(response),
            Self::Stream(_) => Err(LlmError::UnsupportedOperation(
                "call returned a stream; read it with into_stream()".to_string(),
            )),
        }
    }

    pub fn into_stream(self) -> Result<BlockingStream, LlmError> {
        match self {
            Self::Stream(stream) => Ok(stream),
            Self::Response(_) => Err(LlmError::UnsupportedOperation(
                "call returned a terminal response; read it with into_response()".to_string(),
            )),
        }
    }
}

/// Lazily pulls chunks from the async stream; dropping it cancels the
/// underlying request.
pub struct BlockingStream {
    inner: ChatCompletionStream,
    runtime: Arc<Runtime>,
}

impl Iterator for BlockingStream {
    type Item = Result<ChatCompletionResponse, LlmError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.runtime.block_on(self.inner.next())
    }
}

/// Blocking client for heterogeneous LLM backends.
pub struct Client {
    inner: crate::Client,
    runtime: Arc<Runtime>,
}

impl Client {
    pub fn new() -> Result<Self, LlmError> {
        Self::with_configs(HashMap::new())
    }

    pub fn with_configs(configs: HashMap<String, ProviderConfig>) -> Result<Self, LlmError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| LlmError::InternalError(format!("failed to build runtime: {e}")))?;
        Ok(Self {
            inner: crate::Client::with_configs(configs)?,
            runtime: Arc::new(runtime),
        })
    }

    /// See [`crate::Client::configure`].
    pub fn configure(&self, configs: HashMap<String, ProviderConfig>) -> Result<(), LlmError> {
        self.inner.configure(configs)
    }

    pub fn chat(&self) -> Chat<'_> {
        Chat { client: self }
    }

    /// See [`crate::Client::run_parallel`]. One worker per model,
    /// joined when all complete.
    pub fn run_parallel<I, S>(
        &self,
        models: I,
        messages: &[Message],
        options: &RequestOptions,
    ) -> HashMap<String, Result<ChatCompletionResponse, LlmError>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runtime
            .block_on(self.inner.run_parallel(models, messages, options))
    }

    /// Close every cached adapter.
    pub fn close(&self) {
        self.runtime.block_on(self.inner.close());
    }
}

/// `client.chat()` API group.
pub struct Chat<'a> {
    client: &'a Client,
}

impl<'a> Chat<'a> {
    pub fn completions(&self) -> Completions<'a> {
        Completions {
            client: self.client,
        }
    }
}

/// `client.chat().completions()` API group.
pub struct Completions<'a> {
    client: &'a Client,
}

impl Completions<'_> {
    /// Blocking counterpart of the async `create`; identical routing
    /// and error semantics.
    pub fn create(
        &self,
        model: &str,
        messages: &[Message],
        options: &RequestOptions,
    ) -> Result<ChatCompletion, LlmError> {
        let outcome = self.client.runtime.block_on(
            self.client
                .inner
                .chat()
                .completions()
                .create(model, messages, options),
        )?;
        Ok(match outcome {
            crate::ChatCompletion::Response(response) => ChatCompletion::Response(response),
            crate::ChatCompletion::Stream(stream) => ChatCompletion::Stream(BlockingStream {
                inner: stream,
                runtime: Arc::clone(&self.client.runtime),
            }),
        })
    }
}
