use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{CallbackHandler, RunContext, RunType};
use crate::Value;

/// Reports every run through `tracing`. Completion prompts and responses are
/// logged at `info`, everything else at `debug`.
#[derive(Clone, Debug, Default)]
pub struct TracingCallbackHandler;

#[async_trait]
impl CallbackHandler for TracingCallbackHandler {
    async fn on_start(&self, ctx: &RunContext, inputs: &Value) {
        match ctx.run_type {
            RunType::Llm => {
                let prompt = inputs.get("prompt").and_then(Value::as_str).unwrap_or("");
                info!(run_id = %ctx.run_id, name = %ctx.name, "LLM started with prompt:\n{prompt}");
            }
            _ => debug!(
                run_id = %ctx.run_id,
                run_type = ?ctx.run_type,
                name = %ctx.name,
                inputs = %inputs,
                "run started"
            ),
        }
    }

    async fn on_end(&self, ctx: &RunContext, outputs: &Value, duration_ms: u128) {
        match ctx.run_type {
            RunType::Llm => {
                let text = outputs.get("text").and_then(Value::as_str).unwrap_or("");
                info!(run_id = %ctx.run_id, duration_ms = duration_ms as u64, "LLM response:\n{text}");
            }
            _ => debug!(
                run_id = %ctx.run_id,
                run_type = ?ctx.run_type,
                name = %ctx.name,
                outputs = %outputs,
                duration_ms = duration_ms as u64,
                "run finished"
            ),
        }
    }

    async fn on_error(&self, ctx: &RunContext, error: &Value, duration_ms: u128) {
        warn!(
            run_id = %ctx.run_id,
            run_type = ?ctx.run_type,
            name = %ctx.name,
            error = %error,
            duration_ms = duration_ms as u64,
            "run failed"
        );
    }
}
