use ponder_core::PonderError;
use thiserror::Error;

/// Terminal failures of an agent session.
///
/// A tool that fails while running is not represented here: its error becomes
/// the step's observation and the loop carries on.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("duplicate tool name: {name}")]
    DuplicateTool { name: String },
    #[error("could not parse LLM output: `{output}` ({reason})")]
    Parse { output: String, reason: String },
    #[error("tool '{tool}' is not registered (available: [{}])", .available.join(", "))]
    ToolNotFound { tool: String, available: Vec<String> },
    #[error("agent stopped after {max_iterations} iteration(s) without a final answer")]
    StepLimitExceeded { max_iterations: usize },
    #[error("completion call failed: {0}")]
    Model(#[source] PonderError),
    #[error("agent loop ended without a final answer")]
    Incomplete,
}

impl AgentError {
    pub(crate) fn parse(output: &str, reason: impl Into<String>) -> Self {
        AgentError::Parse {
            output: output.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<AgentError> for PonderError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Configuration(reason) => PonderError::InvalidConfig(reason),
            AgentError::DuplicateTool { name } => {
                PonderError::InvalidConfig(format!("duplicate tool name: {name}"))
            }
            AgentError::Parse { output, reason } => PonderError::ParseFailed { output, reason },
            AgentError::ToolNotFound { tool, .. } => PonderError::ToolCallFailed {
                tool_name: tool,
                reason: "not registered".to_string(),
            },
            AgentError::StepLimitExceeded { max_iterations } => {
                PonderError::MaxIterationsExceeded {
                    max: max_iterations,
                }
            }
            AgentError::Model(inner) => inner,
            AgentError::Incomplete => PonderError::Custom(AgentError::Incomplete.to_string()),
        }
    }
}
