use std::collections::HashSet;

use ponder_core::StreamEvent;

use crate::action::AgentAction;
use crate::executor::AgentOutput;

/// Progress of a running session, in the order the loop produces it.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    StepStarted {
        step: usize,
    },
    ModelResponded {
        step: usize,
        text: String,
    },
    ToolDispatched {
        step: usize,
        action: AgentAction,
    },
    ToolCompleted {
        step: usize,
        tool: String,
        observation: String,
        failed: bool,
    },
    Finished(AgentOutput),
}

impl AgentEvent {
    pub fn step(&self) -> Option<usize> {
        match self {
            AgentEvent::StepStarted { step }
            | AgentEvent::ModelResponded { step, .. }
            | AgentEvent::ToolDispatched { step, .. }
            | AgentEvent::ToolCompleted { step, .. } => Some(*step),
            AgentEvent::Finished(_) => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, AgentEvent::Finished(_))
    }

    /// Maps onto the generic event stream used by [`ponder_core::Runnable::stream`].
    pub fn into_stream_event(self) -> StreamEvent {
        match self {
            AgentEvent::StepStarted { step } => StreamEvent::Metadata {
                key: "step".to_string(),
                value: serde_json::json!(step),
            },
            AgentEvent::ModelResponded { text, .. } => StreamEvent::ContentChunk(text),
            AgentEvent::ToolDispatched { action, .. } => StreamEvent::Action {
                tool: action.tool,
                input: action.tool_input,
            },
            AgentEvent::ToolCompleted {
                tool, observation, ..
            } => StreamEvent::Observation {
                tool,
                output: observation,
            },
            AgentEvent::Finished(output) => {
                StreamEvent::FinalAnswer(output.output().unwrap_or_default().to_string())
            }
        }
    }
}

/// Checks that a recorded event sequence is well formed: every step starts
/// before anything else happens in it, each dispatch is completed exactly once,
/// and `Finished` appears at most once, last.
pub fn validate_event_sequence(events: &[AgentEvent]) -> Result<(), String> {
    let mut started: HashSet<usize> = HashSet::new();
    let mut open_dispatch: Option<usize> = None;

    for (index, event) in events.iter().enumerate() {
        if let Some(step) = event.step() {
            if matches!(event, AgentEvent::StepStarted { .. }) {
                if !started.insert(step) {
                    return Err(format!("step {step} started twice at index {index}"));
                }
            } else if !started.contains(&step) {
                return Err(format!(
                    "event for step {step} before StepStarted at index {index}"
                ));
            }
        }
        match event {
            AgentEvent::ToolDispatched { step, .. } => {
                if let Some(open) = open_dispatch {
                    return Err(format!(
                        "dispatch for step {step} while step {open} is still open at index {index}"
                    ));
                }
                open_dispatch = Some(*step);
            }
            AgentEvent::ToolCompleted { step, .. } => {
                if open_dispatch != Some(*step) {
                    return Err(format!(
                        "ToolCompleted without dispatch for step {step} at index {index}"
                    ));
                }
                open_dispatch = None;
            }
            AgentEvent::Finished(_) if index + 1 != events.len() => {
                return Err(format!("Finished is not the last event (index {index})"));
            }
            _ => {}
        }
    }

    match open_dispatch {
        Some(step) if events.last().is_some_and(AgentEvent::is_finished) => Err(format!(
            "finished while the dispatch for step {step} was still open"
        )),
        _ => Ok(()),
    }
}
