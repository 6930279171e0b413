//! Reason-and-act agents over text-completion models.
//!
//! This crate re-exports the workspace crates behind feature flags:
//! `llm` for the HTTP completion clients and `agent` for the ReAct loop.
//! Most programs only need the [`prelude`].

pub use ponder_core as core;
pub use ponder_prompt as prompt;

#[cfg(feature = "agent")]
pub use ponder_agent as agent;
#[cfg(feature = "llm")]
pub use ponder_llm as llm;

pub mod prelude {
    pub use ponder_core::{
        CallbackHandler, CallbackManager, CompletionLlm, CompletionRequest, CompletionResponse,
        FunctionTool, PonderError, Runnable, RunnableExt, RunnableLambda, StreamEvent, Tool,
        ToolError, TracingCallbackHandler,
    };
    pub use ponder_prompt::{PromptTemplate, REACT_TEMPLATE};

    #[cfg(feature = "agent")]
    pub use ponder_agent::{
        extract_output, AgentError, AgentEvent, AgentExecutor, AgentOutput, ExecutorConfig,
        ExecutorOptions,
    };
    #[cfg(feature = "llm")]
    pub use ponder_llm::{OllamaClient, OpenAiCompatibleClient};
}
