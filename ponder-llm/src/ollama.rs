use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Deserializer;
use tracing::debug;

use ponder_core::{
    truncate_at_stop, CompletionRequest, CompletionResponse, PonderError, Runnable, StreamEvent,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Text completions against a local Ollama server (`POST /api/generate`).
#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    http: Client,
}

impl std::fmt::Debug for OllamaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// Decodes an NDJSON `/api/generate` stream body into stream events.
///
/// Text is cut at the first stop sequence, even one split across chunks.
/// A chunk tail that could still grow into a stop sequence is held back
/// until the next chunk settles it.
pub fn ollama_stream_events(
    input: &[u8],
    stop: &[String],
) -> Result<Vec<StreamEvent>, PonderError> {
    let mut events = Vec::new();
    let mut text = String::new();
    let mut emitted = 0;
    for item in Deserializer::from_slice(input).into_iter::<GenerateResponse>() {
        let chunk = item?;
        text.push_str(&chunk.response);

        let kept = truncate_at_stop(&text, stop).len().max(emitted);
        if kept < text.len() || chunk.done {
            events.push(StreamEvent::FinalAnswer(text[emitted..kept].to_string()));
            return Ok(events);
        }

        let ready = text.len() - partial_stop_len(&text[emitted..], stop);
        if ready > emitted {
            events.push(StreamEvent::ContentChunk(text[emitted..ready].to_string()));
            emitted = ready;
        }
    }
    if emitted < text.len() {
        events.push(StreamEvent::ContentChunk(text[emitted..].to_string()));
    }
    Ok(events)
}

/// Length of the longest suffix of `pending` that starts some stop sequence.
fn partial_stop_len(pending: &str, stop: &[String]) -> usize {
    stop.iter()
        .flat_map(|marker| {
            (1..marker.len())
                .filter(move |&end| marker.is_char_boundary(end))
                .map(move |end| &marker[..end])
        })
        .filter(|prefix| pending.ends_with(prefix))
        .map(str::len)
        .max()
        .unwrap_or(0)
}

impl OllamaClient {
    pub fn new(base_url: String, model: String) -> Result<Self, PonderError> {
        Self::with_timeout(base_url, model, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, PonderError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| PonderError::LlmProvider(err.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn generate_request<'a>(
        &'a self,
        input: &'a CompletionRequest,
        stream: bool,
    ) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.model,
            prompt: &input.prompt,
            stream,
            options: GenerateOptions {
                stop: &input.stop,
                temperature: input.temperature,
            },
        }
    }

    async fn post(&self, body: &GenerateRequest<'_>) -> Result<reqwest::Response, PonderError> {
        let url = format!("{}/api/generate", self.base_url);
        self.http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| PonderError::LlmProvider(err.to_string()))?
            .error_for_status()
            .map_err(|err| PonderError::LlmProvider(err.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions<'a>,
}

#[derive(Debug, Serialize)]
struct GenerateOptions<'a> {
    #[serde(skip_serializing_if = "no_stop")]
    stop: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

fn no_stop(stop: &&[String]) -> bool {
    stop.is_empty()
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    done: bool,
}

#[async_trait::async_trait]
impl Runnable<CompletionRequest, CompletionResponse> for OllamaClient {
    async fn invoke(&self, input: CompletionRequest) -> Result<CompletionResponse, PonderError> {
        debug!(model = %self.model, stop = ?input.stop, "ollama generate");
        let body = self.generate_request(&input, false);
        let response: GenerateResponse = self
            .post(&body)
            .await?
            .json()
            .await
            .map_err(|err| PonderError::LlmProvider(err.to_string()))?;

        Ok(CompletionResponse::new(truncate_at_stop(
            &response.response,
            &input.stop,
        )))
    }

    fn stream(&self, input: CompletionRequest) -> BoxStream<'_, Result<StreamEvent, PonderError>> {
        let collected = async move {
            let body = self.generate_request(&input, true);
            let bytes = self
                .post(&body)
                .await?
                .bytes()
                .await
                .map_err(|err| PonderError::LlmProvider(err.to_string()))?;
            ollama_stream_events(&bytes, &input.stop)
        };

        stream::once(collected)
            .flat_map(|result| match result {
                Ok(events) => stream::iter(events.into_iter().map(Ok)).boxed(),
                Err(err) => stream::iter(vec![Err(err)]).boxed(),
            })
            .boxed()
    }
}
