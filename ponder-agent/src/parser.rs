//! Classifies a raw completion as either a tool action or a final answer.
//!
//! Two passes, in order:
//! 1. `Final Answer:` anywhere in the text means [`AgentStep::Finish`]; the
//!    answer is everything after the last occurrence of the marker.
//! 2. Otherwise `Action:` followed by `Action Input:` means
//!    [`AgentStep::Action`]. The tool name runs to the end of the `Action:`
//!    line, the input runs to the end of the text or the first stop marker.
//!
//! Anything else is a parse error. Markers are case-sensitive.

use futures::stream::{self, BoxStream, StreamExt};
use ponder_core::{truncate_at_stop, PonderError, Runnable, StreamEvent};

use crate::action::{AgentAction, AgentFinish, AgentStep, ReturnValues, OUTPUT_KEY};
use crate::AgentError;

pub const FINAL_ANSWER_MARKER: &str = "Final Answer:";
pub const ACTION_MARKER: &str = "Action:";
pub const ACTION_INPUT_MARKER: &str = "Action Input:";
pub const DEFAULT_STOP: &str = "\nObservation";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReActOutputParser {
    stop_markers: Vec<String>,
}

impl Default for ReActOutputParser {
    fn default() -> Self {
        Self {
            stop_markers: vec![DEFAULT_STOP.to_string()],
        }
    }
}

impl ReActOutputParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `stop_markers` to bound the action input, normally the same
    /// sequences the completion engine was asked to stop on.
    pub fn with_stop_markers(stop_markers: Vec<String>) -> Self {
        Self { stop_markers }
    }

    pub fn stop_markers(&self) -> &[String] {
        &self.stop_markers
    }

    pub fn parse(&self, text: &str) -> Result<AgentStep, AgentError> {
        if let Some(finish) = parse_finish(text) {
            return Ok(AgentStep::Finish(finish));
        }
        self.parse_action(text).map(AgentStep::Action)
    }

    fn parse_action(&self, text: &str) -> Result<AgentAction, AgentError> {
        let Some(action_at) = text.find(ACTION_MARKER) else {
            return Err(AgentError::parse(
                text,
                "expected 'Action:' with 'Action Input:', or 'Final Answer:'",
            ));
        };
        let after_action = &text[action_at + ACTION_MARKER.len()..];

        let Some(input_at) = after_action.find(ACTION_INPUT_MARKER) else {
            return Err(AgentError::parse(text, "missing 'Action Input:' after 'Action:'"));
        };

        let line_end = after_action.find('\n').unwrap_or(after_action.len());
        let tool = after_action[..line_end.min(input_at)].trim();
        if tool.is_empty() {
            return Err(AgentError::parse(text, "missing tool name after 'Action:'"));
        }

        let raw_input = &after_action[input_at + ACTION_INPUT_MARKER.len()..];
        let tool_input =
            strip_one_quote_layer(truncate_at_stop(raw_input, &self.stop_markers).trim());

        Ok(AgentAction {
            tool: tool.to_string(),
            tool_input: tool_input.to_string(),
            log: text.to_string(),
        })
    }
}

fn parse_finish(text: &str) -> Option<AgentFinish> {
    let (_, answer) = text.rsplit_once(FINAL_ANSWER_MARKER)?;
    let mut return_values = ReturnValues::new();
    return_values.insert(OUTPUT_KEY.to_string(), answer.trim().to_string());
    Some(AgentFinish {
        return_values,
        log: text.to_string(),
    })
}

/// Removes one matching pair of `"` or `'` around `value`. Unbalanced or
/// mismatched quotes are left untouched.
fn strip_one_quote_layer(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[async_trait::async_trait]
impl Runnable<String, AgentStep> for ReActOutputParser {
    async fn invoke(&self, input: String) -> Result<AgentStep, PonderError> {
        self.parse(&input).map_err(PonderError::from)
    }

    fn stream(&self, input: String) -> BoxStream<'_, Result<StreamEvent, PonderError>> {
        let event = self
            .parse(&input)
            .map(|step| match step {
                AgentStep::Action(action) => StreamEvent::Action {
                    tool: action.tool,
                    input: action.tool_input,
                },
                AgentStep::Finish(finish) => {
                    StreamEvent::FinalAnswer(finish.output().unwrap_or_default().to_string())
                }
            })
            .map_err(PonderError::from);
        stream::once(async move { event }).boxed()
    }
}
