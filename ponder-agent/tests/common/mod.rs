#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::stream::{self, BoxStream, StreamExt};
use ponder_core::{
    CompletionRequest, CompletionResponse, PonderError, Runnable, StreamEvent, Tool, ToolError,
};

/// Replays canned completions in order, repeating the last one once the
/// script runs out, and records every request it receives.
#[derive(Clone)]
pub struct ScriptedLlm {
    responses: Arc<Vec<String>>,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedLlm {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Arc::new(responses.into_iter().map(Into::into).collect()),
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|request| request.prompt)
            .collect()
    }
}

#[async_trait::async_trait]
impl Runnable<CompletionRequest, CompletionResponse> for ScriptedLlm {
    async fn invoke(&self, input: CompletionRequest) -> Result<CompletionResponse, PonderError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(input);
        let text = self
            .responses
            .get(index)
            .or_else(|| self.responses.last())
            .cloned()
            .unwrap_or_default();
        Ok(CompletionResponse::new(text))
    }

    fn stream(&self, _input: CompletionRequest) -> BoxStream<'_, Result<StreamEvent, PonderError>> {
        stream::empty().boxed()
    }
}

pub struct FailingLlm;

#[async_trait::async_trait]
impl Runnable<CompletionRequest, CompletionResponse> for FailingLlm {
    async fn invoke(&self, _input: CompletionRequest) -> Result<CompletionResponse, PonderError> {
        Err(PonderError::LlmProvider("connection refused".to_string()))
    }

    fn stream(&self, _input: CompletionRequest) -> BoxStream<'_, Result<StreamEvent, PonderError>> {
        stream::empty().boxed()
    }
}

/// Always answers with a fixed observation and records its inputs.
#[derive(Clone)]
pub struct StubTool {
    name: &'static str,
    reply: &'static str,
    seen: Arc<Mutex<Vec<String>>>,
}

impl StubTool {
    pub fn new(name: &'static str, reply: &'static str) -> Self {
        Self {
            name,
            reply,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Tool for StubTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "stub tool for tests"
    }

    async fn invoke(&self, input: &str) -> Result<String, ToolError> {
        self.seen.lock().unwrap().push(input.to_string());
        Ok(self.reply.to_string())
    }
}

pub struct BrokenTool;

#[async_trait::async_trait]
impl Tool for BrokenTool {
    fn name(&self) -> &str {
        "broken"
    }

    fn description(&self) -> &str {
        "always fails"
    }

    async fn invoke(&self, _input: &str) -> Result<String, ToolError> {
        Err(ToolError::ExecutionFailed("disk on fire".to_string()))
    }
}

pub struct PanickingTool;

#[async_trait::async_trait]
impl Tool for PanickingTool {
    fn name(&self) -> &str {
        "panicky"
    }

    fn description(&self) -> &str {
        "panics when called"
    }

    async fn invoke(&self, _input: &str) -> Result<String, ToolError> {
        panic!("tool blew up");
    }
}

pub const LENGTH_QUESTION: &str = "What is the length of the text: 'Hello, Leo!'?";

pub const LENGTH_ACTION: &str =
    "Thought: I should measure the text\nAction: get_text_length\nAction Input: \"Hello, Leo!\"";

pub const LENGTH_FINISH: &str = "Thought: I now know the final answer\nFinal Answer: 10";
