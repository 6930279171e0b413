use std::collections::HashMap;

use ponder_core::Value;
use ponder_prompt::PromptTemplate;

use crate::scratchpad::render_scratchpad;
use crate::session::Session;
use crate::tool::ToolRegistry;
use crate::AgentError;

pub const REQUIRED_SLOTS: [&str; 4] = ["tools", "tool_names", "input", "agent_scratchpad"];

/// Checks that `template` defines exactly the four agent slots.
pub fn validate_template(template: &PromptTemplate) -> Result<(), AgentError> {
    template
        .require(&REQUIRED_SLOTS)
        .map_err(|err| AgentError::Configuration(err.to_string()))?;
    let variables = template
        .input_variables()
        .map_err(|err| AgentError::Configuration(err.to_string()))?;
    let unknown: Vec<String> = variables
        .into_iter()
        .filter(|name| !REQUIRED_SLOTS.contains(&name.as_str()))
        .collect();
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(AgentError::Configuration(format!(
            "prompt template has unbound slot(s): {}",
            unknown.join(", ")
        )))
    }
}

/// Builds the exact prompt text for the next completion.
pub fn render_prompt(
    template: &PromptTemplate,
    tools: &ToolRegistry,
    session: &Session,
) -> Result<String, AgentError> {
    let vars = HashMap::from([
        ("tools".to_string(), Value::String(tools.describe())),
        ("tool_names".to_string(), Value::String(tools.names().join(", "))),
        ("input".to_string(), Value::String(session.input().to_string())),
        (
            "agent_scratchpad".to_string(),
            Value::String(render_scratchpad(session.scratchpad().steps())),
        ),
    ]);
    template
        .render(&vars)
        .map_err(|err| AgentError::Configuration(err.to_string()))
}
