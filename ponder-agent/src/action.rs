use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::parser::ACTION_MARKER;

/// Final values returned by a finished agent, keyed by name (usually `output`).
pub type ReturnValues = BTreeMap<String, String>;

pub const OUTPUT_KEY: &str = "output";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentAction {
    pub tool: String,
    pub tool_input: String,
    pub log: String,
}

impl AgentAction {
    /// The free-text reasoning the model wrote before `Action:`.
    pub fn thought(&self) -> &str {
        let before = match self.log.find(ACTION_MARKER) {
            Some(index) => &self.log[..index],
            None => "",
        };
        let before = before.trim();
        before.strip_prefix("Thought:").unwrap_or(before).trim()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentFinish {
    pub return_values: ReturnValues,
    pub log: String,
}

impl AgentFinish {
    pub fn output(&self) -> Option<&str> {
        self.return_values.get(OUTPUT_KEY).map(String::as_str)
    }
}

/// The decision parsed out of one completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AgentStep {
    Action(AgentAction),
    Finish(AgentFinish),
}

/// An executed action together with what the tool returned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntermediateStep {
    pub action: AgentAction,
    pub observation: String,
}

impl IntermediateStep {
    pub fn new(action: AgentAction, observation: impl Into<String>) -> Self {
        Self {
            action,
            observation: observation.into(),
        }
    }
}
