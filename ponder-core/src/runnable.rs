use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::PonderError;

/// Incremental output of a [`Runnable`] stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    ContentChunk(String),
    Action { tool: String, input: String },
    Observation { tool: String, output: String },
    FinalAnswer(String),
    Metadata { key: String, value: crate::Value },
}

#[async_trait]
pub trait Runnable<Input: Send + 'static, Output: Send + 'static> {
    async fn invoke(&self, input: Input) -> Result<Output, PonderError>;

    fn stream(&self, input: Input) -> BoxStream<'_, Result<StreamEvent, PonderError>>;
}
