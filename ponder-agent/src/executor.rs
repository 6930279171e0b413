use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use ponder_core::callbacks::{ToTraceInput, ToTraceOutput};
use ponder_core::{
    CallbackHandler, CallbackManager, CompletionLlm, CompletionRequest, PonderError, RunContext,
    RunType, Runnable, RunnableLambda, StreamEvent, Tool,
};
use ponder_prompt::PromptTemplate;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::action::{AgentAction, AgentStep, IntermediateStep, ReturnValues, OUTPUT_KEY};
use crate::config::ExecutorConfig;
use crate::event::AgentEvent;
use crate::parser::ReActOutputParser;
use crate::prompt::{render_prompt, validate_template};
use crate::session::Session;
use crate::tool::{invoke_tool, ToolRegistry};
use crate::AgentError;

/// What a finished session hands back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentOutput {
    pub return_values: ReturnValues,
    /// Executed steps in order. Empty unless
    /// [`ExecutorConfig::return_intermediate_steps`] is set.
    pub intermediate_steps: Vec<IntermediateStep>,
}

impl AgentOutput {
    pub fn output(&self) -> Option<&str> {
        self.return_values.get(OUTPUT_KEY).map(String::as_str)
    }
}

/// Runs the Thought / Action / Observation loop against a completion model.
///
/// An executor holds only read-only configuration. Each call to [`run`],
/// [`run_stream`] or [`start`] owns a fresh [`Session`], so one executor can
/// serve concurrent sessions.
///
/// [`run`]: AgentExecutor::run
/// [`run_stream`]: AgentExecutor::run_stream
/// [`start`]: AgentExecutor::start
pub struct AgentExecutor {
    llm: Arc<dyn CompletionLlm>,
    tools: ToolRegistry,
    prompt: PromptTemplate,
    parser: ReActOutputParser,
    config: ExecutorConfig,
    callbacks: CallbackManager,
}

impl std::fmt::Debug for AgentExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentExecutor")
            .field("tools", &self.tools)
            .field("config", &self.config)
            .field("callbacks", &self.callbacks)
            .finish_non_exhaustive()
    }
}

impl AgentExecutor {
    pub fn builder() -> AgentExecutorBuilder {
        AgentExecutorBuilder::default()
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn prompt(&self) -> &PromptTemplate {
        &self.prompt
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Starts a session that is advanced one transition at a time.
    pub fn start(&self, input: impl Into<String>) -> AgentRun<'_> {
        AgentRun::new(self, Session::new(input))
    }

    /// Runs a session to completion.
    pub async fn run(&self, input: impl Into<String>) -> Result<AgentOutput, AgentError> {
        let mut run = self.start(input);
        while let Some(event) = run.next_event().await {
            if let AgentEvent::Finished(output) = event? {
                return Ok(output);
            }
        }
        Err(AgentError::Incomplete)
    }

    /// Runs a session, yielding every loop event. A terminal error is the
    /// last item of the stream.
    pub fn run_stream(
        &self,
        input: impl Into<String>,
    ) -> BoxStream<'_, Result<AgentEvent, AgentError>> {
        stream::unfold(self.start(input), |mut run| async move {
            run.next_event().await.map(|event| (event, run))
        })
        .boxed()
    }
}

#[async_trait]
impl Runnable<String, ReturnValues> for AgentExecutor {
    async fn invoke(&self, input: String) -> Result<ReturnValues, PonderError> {
        self.run(input)
            .await
            .map(|output| output.return_values)
            .map_err(PonderError::from)
    }

    fn stream(&self, input: String) -> BoxStream<'_, Result<StreamEvent, PonderError>> {
        self.run_stream(input)
            .map(|event| {
                event
                    .map(AgentEvent::into_stream_event)
                    .map_err(PonderError::from)
            })
            .boxed()
    }
}

pub type OutputExtractor =
    RunnableLambda<fn(ReturnValues) -> Result<String, PonderError>, ReturnValues, String>;

/// Pulls the `output` value out of an executor's return values, for chaining
/// with [`ponder_core::RunnableExt::then`].
pub fn extract_output() -> OutputExtractor {
    fn pick(values: ReturnValues) -> Result<String, PonderError> {
        values
            .get(OUTPUT_KEY)
            .cloned()
            .ok_or_else(|| PonderError::Custom(format!("agent returned no `{OUTPUT_KEY}` value")))
    }
    RunnableLambda::new(pick as fn(ReturnValues) -> Result<String, PonderError>)
}

#[derive(Default)]
pub struct AgentExecutorBuilder {
    llm: Option<Arc<dyn CompletionLlm>>,
    tools: Vec<Arc<dyn Tool>>,
    prompt: Option<PromptTemplate>,
    config: ExecutorConfig,
    callbacks: CallbackManager,
}

impl AgentExecutorBuilder {
    pub fn llm(mut self, llm: impl CompletionLlm + 'static) -> Self {
        self.llm = Some(Arc::new(llm));
        self
    }

    pub fn shared_llm(mut self, llm: Arc<dyn CompletionLlm>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn tool(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Defaults to [`PromptTemplate::react`].
    pub fn prompt(mut self, prompt: PromptTemplate) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_iterations(mut self, max_iterations: Option<usize>) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub fn return_intermediate_steps(mut self, enabled: bool) -> Self {
        self.config.return_intermediate_steps = enabled;
        self
    }

    pub fn callbacks(mut self, callbacks: CallbackManager) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn callback(mut self, handler: Arc<dyn CallbackHandler>) -> Self {
        self.callbacks.add_handler(handler);
        self
    }

    pub fn build(self) -> Result<AgentExecutor, AgentError> {
        let llm = self
            .llm
            .ok_or_else(|| AgentError::Configuration("missing completion client".to_string()))?;
        if self.tools.is_empty() {
            return Err(AgentError::Configuration("missing tool catalog".to_string()));
        }
        let tools = ToolRegistry::from_tools(self.tools)?;
        let prompt = self.prompt.unwrap_or_else(PromptTemplate::react);
        validate_template(&prompt)?;
        self.config.validate()?;

        Ok(AgentExecutor {
            llm,
            tools,
            prompt,
            parser: ReActOutputParser::with_stop_markers(self.config.stop.clone()),
            config: self.config,
            callbacks: self.callbacks,
        })
    }
}

/// Observable position of an [`AgentRun`] in the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Rendering,
    AwaitingCompletion,
    Parsing,
    Dispatching,
    Finished,
    Failed,
}

enum LoopState {
    Render,
    Complete { prompt: String },
    Parse { text: String },
    Dispatch {
        action: AgentAction,
        tool: Arc<dyn Tool>,
    },
    Done,
    Aborted,
}

/// A single session driven step by step.
///
/// Each call to [`next_event`](AgentRun::next_event) performs one transition
/// and reports it. After `Finished` or an error the run yields `None`.
pub struct AgentRun<'a> {
    executor: &'a AgentExecutor,
    session: Session,
    state: LoopState,
    root: RunContext,
    started: bool,
}

impl<'a> AgentRun<'a> {
    fn new(executor: &'a AgentExecutor, session: Session) -> Self {
        Self {
            executor,
            session,
            state: LoopState::Render,
            root: RunContext::root(RunType::Agent, "react_agent"),
            started: false,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    pub fn phase(&self) -> LoopPhase {
        match self.state {
            LoopState::Render => LoopPhase::Rendering,
            LoopState::Complete { .. } => LoopPhase::AwaitingCompletion,
            LoopState::Parse { .. } => LoopPhase::Parsing,
            LoopState::Dispatch { .. } => LoopPhase::Dispatching,
            LoopState::Done => LoopPhase::Finished,
            LoopState::Aborted => LoopPhase::Failed,
        }
    }

    pub async fn next_event(&mut self) -> Option<Result<AgentEvent, AgentError>> {
        let state = std::mem::replace(&mut self.state, LoopState::Aborted);
        let result = match state {
            LoopState::Done => {
                self.state = LoopState::Done;
                return None;
            }
            LoopState::Aborted => return None,
            LoopState::Render => self.render().await,
            LoopState::Complete { prompt } => self.complete(prompt).await,
            LoopState::Parse { text } => self.parse(text).await,
            LoopState::Dispatch { action, tool } => self.dispatch(action, tool).await,
        };
        if let Err(err) = &result {
            self.abort(err).await;
        }
        Some(result)
    }

    fn current_step(&self) -> usize {
        self.session.step_count() + 1
    }

    async fn render(&mut self) -> Result<AgentEvent, AgentError> {
        let executor = self.executor;
        if !self.started {
            self.started = true;
            info!(
                run_id = %self.root.run_id,
                tools = executor.tools.len(),
                "agent loop starting"
            );
            if !executor.callbacks.is_noop() {
                let inputs = json!({ "input": self.session.input() });
                executor.callbacks.on_start(&self.root, &inputs).await;
            }
        }

        if let Some(max_iterations) = executor.config.max_iterations {
            if self.session.step_count() >= max_iterations {
                return Err(AgentError::StepLimitExceeded { max_iterations });
            }
        }

        let step = self.current_step();
        let prompt = render_prompt(&executor.prompt, &executor.tools, &self.session)?;
        debug!(step, prompt_chars = prompt.len(), "prompt rendered");
        self.state = LoopState::Complete { prompt };
        Ok(AgentEvent::StepStarted { step })
    }

    async fn complete(&mut self, prompt: String) -> Result<AgentEvent, AgentError> {
        let executor = self.executor;
        let step = self.current_step();
        let mut request = CompletionRequest::new(prompt).with_stop(executor.config.stop.clone());
        if let Some(temperature) = executor.config.temperature {
            request = request.with_temperature(temperature);
        }

        let ctx = self.root.child(RunType::Llm, "completion".to_string());
        let traced = !executor.callbacks.is_noop();
        if traced {
            executor
                .callbacks
                .on_start(&ctx, &request.to_trace_input())
                .await;
        }

        let response = match executor.llm.invoke(request).await {
            Ok(response) => response,
            Err(err) => {
                if traced {
                    let error = json!({ "error": err.to_string() });
                    executor.callbacks.on_error(&ctx, &error, ctx.elapsed_ms()).await;
                }
                return Err(AgentError::Model(err));
            }
        };
        if traced {
            executor
                .callbacks
                .on_end(&ctx, &response.to_trace_output(), ctx.elapsed_ms())
                .await;
        }

        debug!(step, chars = response.text.len(), "model responded");
        self.state = LoopState::Parse {
            text: response.text.clone(),
        };
        Ok(AgentEvent::ModelResponded {
            step,
            text: response.text,
        })
    }

    async fn parse(&mut self, text: String) -> Result<AgentEvent, AgentError> {
        let executor = self.executor;
        let step = self.current_step();
        match executor.parser.parse(&text)? {
            AgentStep::Finish(finish) => {
                let intermediate_steps = if executor.config.return_intermediate_steps {
                    self.session.scratchpad().steps().to_vec()
                } else {
                    Vec::new()
                };
                let output = AgentOutput {
                    return_values: finish.return_values,
                    intermediate_steps,
                };
                if !executor.callbacks.is_noop() {
                    executor
                        .callbacks
                        .on_end(
                            &self.root,
                            &output.return_values.to_trace_output(),
                            self.root.elapsed_ms(),
                        )
                        .await;
                }
                info!(
                    run_id = %self.root.run_id,
                    steps = self.session.step_count(),
                    "agent finished"
                );
                self.state = LoopState::Done;
                Ok(AgentEvent::Finished(output))
            }
            AgentStep::Action(action) => {
                let tool = Arc::clone(executor.tools.resolve(&action.tool)?);
                debug!(step, tool = %action.tool, input = %action.tool_input, "dispatching tool");
                self.state = LoopState::Dispatch {
                    action: action.clone(),
                    tool,
                };
                Ok(AgentEvent::ToolDispatched { step, action })
            }
        }
    }

    async fn dispatch(
        &mut self,
        action: AgentAction,
        tool: Arc<dyn Tool>,
    ) -> Result<AgentEvent, AgentError> {
        let executor = self.executor;
        let step = self.current_step();
        let ctx = self.root.child(RunType::Tool, tool.name().to_string());
        let traced = !executor.callbacks.is_noop();
        if traced {
            let inputs = json!({ "input": action.tool_input });
            executor.callbacks.on_start(&ctx, &inputs).await;
        }

        let outcome = invoke_tool(tool.as_ref(), &action.tool_input).await;
        let failed = outcome.is_failure();
        if traced {
            if failed {
                let error = json!({ "error": outcome.observation() });
                executor.callbacks.on_error(&ctx, &error, ctx.elapsed_ms()).await;
            } else {
                let outputs = json!({ "output": outcome.observation() });
                executor.callbacks.on_end(&ctx, &outputs, ctx.elapsed_ms()).await;
            }
        }
        info!(step, tool = %action.tool, failed, "tool completed");

        let observation = outcome.into_observation();
        let tool_name = action.tool.clone();
        self.session.record(IntermediateStep::new(action, observation.clone()));
        self.state = LoopState::Render;
        Ok(AgentEvent::ToolCompleted {
            step,
            tool: tool_name,
            observation,
            failed,
        })
    }

    async fn abort(&self, err: &AgentError) {
        warn!(
            run_id = %self.root.run_id,
            steps = self.session.step_count(),
            error = %err,
            "agent loop aborted"
        );
        if !self.executor.callbacks.is_noop() {
            let error = json!({ "error": err.to_string() });
            self.executor
                .callbacks
                .on_error(&self.root, &error, self.root.elapsed_ms())
                .await;
        }
    }
}
