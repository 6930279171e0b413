mod chain;
mod error;
mod llm;
mod runnable;
mod tool;
mod value;

pub mod callbacks;

pub use callbacks::{
    ensure_object, CallbackHandler, CallbackManager, RunContext, RunType,
    TracingCallbackHandler,
};
pub use chain::{Chain, RunnableExt, RunnableLambda};
pub use error::PonderError;
pub use llm::{truncate_at_stop, CompletionLlm, CompletionRequest, CompletionResponse};
pub use runnable::{Runnable, StreamEvent};
pub use tool::{FunctionTool, Tool, ToolError};
pub use value::Value;
