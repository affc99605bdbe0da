//! Multi-model fan-out.
//!
//! One request, N models, all dispatched concurrently against the same
//! client. Every task settles: a failing model contributes an error
//! value instead of aborting the batch.

use std::collections::HashMap;

use tokio::task::JoinSet;

use crate::client::{ChatCompletion, Client};
use crate::error::LlmError;
use crate::options::RequestOptions;
use crate::types::{ChatCompletionResponse, Message};

impl Client {
    /// Run the same non-streaming request against every model in
    /// `models` concurrently and wait for all of them to settle.
    ///
    /// Result keys are `"{model}_{counter}"` with the counter assigned
    /// in completion order, so repeating a model id in the input never
    /// collides. No ordering is guaranteed between different models'
    /// results; treat the mapping as order-independent.
    pub async fn run_parallel<I, S>(
        &self,
        models: I,
        messages: &[Message],
        options: &RequestOptions,
    ) -> HashMap<String, Result<ChatCompletionResponse, LlmError>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut join_set = JoinSet::new();
        for model in models {
            let model: String = model.into();
            let client = self.clone();
            let messages = messages.to_vec();
            // Fan-out is terminal-response only.
            let options = RequestOptions {
                stream: false,
                ..options.clone()
            };
            join_set.spawn(async move {
                let result = client
                    .chat()
                    .completions()
                    .create(&model, &messages, &options)
                    .await
                    .and_then(ChatCompletion::into_response);
                (model, result)
            });
        }

        let mut results = HashMap::new();
        let mut counter = 0usize;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((model, result)) => {
                    if let Err(err) = &result {
                        tracing::warn!(%model, %err, "fan-out task failed");
                    }
                    results.insert(format!("{model}_{counter}"), result);
                }
                Err(join_err) => {
                    results.insert(
                        format!("task_{counter}"),
                        Err(LlmError::InternalError(format!(
                            "fan-out task did not complete: {join_err}"
                        ))),
                    );
                }
            }
            counter += 1;
        }
        results
    }
}
