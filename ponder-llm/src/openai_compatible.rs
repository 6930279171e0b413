//! Generic OpenAI-compatible completion client
//!
//! Works with any provider exposing OpenAI's chat completions API (OpenAI,
//! DeepSeek, Together, a local vLLM, ...). The rendered prompt is sent as a
//! single user message and the stop sequences are forwarded verbatim.

use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use ponder_core::{
    truncate_at_stop, CompletionRequest, CompletionResponse, PonderError, Runnable, StreamEvent,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Request body for chat completions endpoint
#[derive(Serialize, Debug, Clone)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Non-streaming response from chat completions
#[derive(Deserialize, Debug, Clone)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Choice {
    pub index: u32,
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ResponseMessage {
    pub role: String,
    pub content: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// OpenAI-style error response
#[derive(Deserialize, Debug, Clone)]
pub struct OpenAiError {
    pub error: ErrorDetail,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub code: Option<String>,
}

#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    endpoint: Url,
    api_key: Option<SecretString>,
    model: String,
    max_tokens: Option<u32>,
    http: Client,
}

impl std::fmt::Debug for OpenAiCompatibleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct OpenAiCompatibleBuilder {
    base_url: Option<String>,
    api_key: Option<SecretString>,
    model: Option<String>,
    max_tokens: Option<u32>,
    timeout: Option<Duration>,
}

impl OpenAiCompatibleBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(api_key.into()));
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<OpenAiCompatibleClient, PonderError> {
        let model = self
            .model
            .filter(|model| !model.trim().is_empty())
            .ok_or_else(|| PonderError::InvalidConfig("model is required".to_string()))?;

        let raw = self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut base = Url::parse(&raw)
            .map_err(|err| PonderError::InvalidConfig(format!("invalid base url '{raw}': {err}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base
            .join("chat/completions")
            .map_err(|err| PonderError::InvalidConfig(err.to_string()))?;

        let http = Client::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .map_err(|err| PonderError::LlmProvider(err.to_string()))?;

        Ok(OpenAiCompatibleClient {
            endpoint,
            api_key: self.api_key,
            model,
            max_tokens: self.max_tokens,
            http,
        })
    }
}

impl OpenAiCompatibleClient {
    pub fn builder() -> OpenAiCompatibleBuilder {
        OpenAiCompatibleBuilder::default()
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    fn chat_request(&self, input: &CompletionRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: input.prompt.clone(),
            }],
            stop: input.stop.clone(),
            temperature: input.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        }
    }
}

#[async_trait::async_trait]
impl Runnable<CompletionRequest, CompletionResponse> for OpenAiCompatibleClient {
    async fn invoke(&self, input: CompletionRequest) -> Result<CompletionResponse, PonderError> {
        debug!(model = %self.model, stop = ?input.stop, "chat completion");
        let mut request = self.http.post(self.endpoint.clone()).json(&self.chat_request(&input));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|err| PonderError::LlmProvider(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| PonderError::LlmProvider(err.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<OpenAiError>(&body)
                .map(|err| err.error.message)
                .unwrap_or(body);
            return Err(PonderError::LlmProvider(format!("{status}: {message}")));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&body)?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| PonderError::LlmProvider("no choices returned".to_string()))?;
        let content = choice.message.content.unwrap_or_default();

        Ok(CompletionResponse::new(truncate_at_stop(&content, &input.stop)))
    }

    fn stream(&self, input: CompletionRequest) -> BoxStream<'_, Result<StreamEvent, PonderError>> {
        stream::once(async move {
            self.invoke(input)
                .await
                .map(|response| StreamEvent::FinalAnswer(response.text))
        })
        .boxed()
    }
}
