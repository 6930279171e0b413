use crate::action::IntermediateStep;
use crate::scratchpad::Scratchpad;

/// State owned by one run of the loop: the task, its history and how many
/// actions have been executed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    input: String,
    scratchpad: Scratchpad,
    step_count: usize,
}

impl Session {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            scratchpad: Scratchpad::new(),
            step_count: 0,
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn scratchpad(&self) -> &Scratchpad {
        &self.scratchpad
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub(crate) fn record(&mut self, step: IntermediateStep) {
        self.scratchpad.push(step);
        self.step_count += 1;
    }
}
