use crate::parser::DEFAULT_STOP;
use crate::AgentError;

pub const DEFAULT_MAX_ITERATIONS: usize = 15;

#[derive(Clone, Debug, PartialEq)]
pub struct ExecutorConfig {
    /// Actions allowed per session. `None` runs until the model finishes.
    pub max_iterations: Option<usize>,
    pub stop: Vec<String>,
    pub temperature: Option<f32>,
    pub return_intermediate_steps: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_iterations: Some(DEFAULT_MAX_ITERATIONS),
            stop: vec![DEFAULT_STOP.to_string()],
            temperature: Some(0.0),
            return_intermediate_steps: false,
        }
    }
}

impl ExecutorConfig {
    pub fn merge(&self, overrides: &ExecutorOptions) -> Self {
        Self {
            max_iterations: overrides.max_iterations.unwrap_or(self.max_iterations),
            stop: overrides.stop.clone().unwrap_or_else(|| self.stop.clone()),
            temperature: overrides.temperature.or(self.temperature),
            return_intermediate_steps: overrides
                .return_intermediate_steps
                .unwrap_or(self.return_intermediate_steps),
        }
    }

    pub fn validate(&self) -> Result<(), AgentError> {
        if self.max_iterations == Some(0) {
            return Err(AgentError::Configuration(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(AgentError::Configuration(format!(
                    "temperature {temperature} is outside [0, 2]"
                )));
            }
        }
        if self.stop.is_empty() || self.stop.iter().any(|marker| marker.is_empty()) {
            return Err(AgentError::Configuration(
                "stop sequences must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Field-by-field overrides for [`ExecutorConfig`]; `None` keeps the base value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExecutorOptions {
    /// `Some(None)` lifts the step limit.
    pub max_iterations: Option<Option<usize>>,
    pub stop: Option<Vec<String>>,
    pub temperature: Option<f32>,
    pub return_intermediate_steps: Option<bool>,
}
