//! A ReAct (reason + act) agent loop over a plain text-completion model.
//!
//! The executor renders a prompt from the task, the tool catalog and the
//! scratchpad of earlier steps, asks the model for a completion, parses it
//! into either a tool call or a final answer, and repeats until the model
//! answers or the step limit is hit.

mod action;
mod config;
mod error;
mod event;
mod executor;
mod parser;
mod prompt;
mod scratchpad;
mod session;
mod tool;

pub use action::{AgentAction, AgentFinish, AgentStep, IntermediateStep, ReturnValues, OUTPUT_KEY};
pub use config::{ExecutorConfig, ExecutorOptions, DEFAULT_MAX_ITERATIONS};
pub use error::AgentError;
pub use event::{validate_event_sequence, AgentEvent};
pub use executor::{
    extract_output, AgentExecutor, AgentExecutorBuilder, AgentOutput, AgentRun, LoopPhase,
    OutputExtractor,
};
pub use parser::{
    ReActOutputParser, ACTION_INPUT_MARKER, ACTION_MARKER, DEFAULT_STOP, FINAL_ANSWER_MARKER,
};
pub use prompt::{render_prompt, validate_template, REQUIRED_SLOTS};
pub use scratchpad::{render_scratchpad, Scratchpad};
pub use session::Session;
pub use tool::{invoke_tool, ToolOutcome, ToolRegistry};
