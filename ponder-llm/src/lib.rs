//! HTTP completion clients for the agent loop.

mod ollama;
mod openai_compatible;

pub use ollama::{ollama_stream_events, OllamaClient};
pub use openai_compatible::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, OpenAiCompatibleBuilder,
    OpenAiCompatibleClient, DEFAULT_BASE_URL,
};
pub use ponder_core::{CompletionLlm, CompletionRequest, CompletionResponse};
