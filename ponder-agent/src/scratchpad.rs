use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::action::IntermediateStep;

/// Append-only, chronologically ordered record of executed steps.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scratchpad {
    steps: Vec<IntermediateStep>,
}

impl Scratchpad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: IntermediateStep) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[IntermediateStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn render(&self) -> String {
        render_scratchpad(&self.steps)
    }

    pub fn into_steps(self) -> Vec<IntermediateStep> {
        self.steps
    }
}

/// Renders steps into the text that fills the `agent_scratchpad` slot.
///
/// Each step becomes the model's thought (if any), then
/// `Action: <tool>\nAction Input: <input>\nObservation: <observation>\n`,
/// then a `Thought:` cue for the next completion. No steps render as `""`.
pub fn render_scratchpad(steps: &[IntermediateStep]) -> String {
    let mut rendered = String::new();
    for step in steps {
        let thought = step.action.thought();
        if thought.is_empty() {
            rendered.push('\n');
        } else {
            rendered.push(' ');
            rendered.push_str(thought);
            rendered.push('\n');
        }
        // Writing into a String cannot fail.
        let _ = write!(
            rendered,
            "Action: {}\nAction Input: {}\nObservation: {}\n",
            step.action.tool, step.action.tool_input, step.observation
        );
        rendered.push_str("Thought:");
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::AgentAction;

    fn step(log: &str, tool: &str, input: &str, observation: &str) -> IntermediateStep {
        IntermediateStep::new(
            AgentAction {
                tool: tool.to_string(),
                tool_input: input.to_string(),
                log: log.to_string(),
            },
            observation,
        )
    }

    #[test]
    fn empty_scratchpad_renders_empty_string() {
        assert_eq!(render_scratchpad(&[]), "");
    }

    #[test]
    fn renders_thought_action_and_observation() {
        let steps = [step(
            " I should measure it\nAction: get_text_length\nAction Input: \"Hello, Leo!\"",
            "get_text_length",
            "Hello, Leo!",
            "11",
        )];
        assert_eq!(
            render_scratchpad(&steps),
            " I should measure it\nAction: get_text_length\nAction Input: Hello, Leo!\nObservation: 11\nThought:"
        );
    }

    #[test]
    fn step_without_thought_starts_on_a_new_line() {
        let steps = [step("Action: echo\nAction Input: hi", "echo", "hi", "hi")];
        assert_eq!(
            render_scratchpad(&steps),
            "\nAction: echo\nAction Input: hi\nObservation: hi\nThought:"
        );
    }
}
