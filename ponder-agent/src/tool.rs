use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use ponder_core::Tool;
use tracing::warn;

use crate::AgentError;

/// Tools available to a session, kept in registration order.
///
/// The registry is read-only once an executor is built, so one instance can
/// back any number of concurrent sessions.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tools(
        tools: impl IntoIterator<Item = Arc<dyn Tool>>,
    ) -> Result<Self, AgentError> {
        let mut registry = Self::new();
        for tool in tools {
            registry.register(tool)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), AgentError> {
        let name = tool.name().to_string();
        if name.trim().is_empty() {
            return Err(AgentError::Configuration(
                "tool name must not be empty or whitespace".to_string(),
            ));
        }
        if self.index.contains_key(&name) {
            return Err(AgentError::DuplicateTool { name });
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&Arc<dyn Tool>, AgentError> {
        self.index
            .get(name)
            .map(|&position| &self.tools[position])
            .ok_or_else(|| AgentError::ToolNotFound {
                tool: name.to_string(),
                available: self.names().into_iter().map(str::to_string).collect(),
            })
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    /// One `name: description` line per tool.
    pub fn describe(&self) -> String {
        self.tools
            .iter()
            .map(|tool| format!("{}: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// What a tool call produced. Either way the text is fed back to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Success(String),
    Failed(String),
}

impl ToolOutcome {
    pub fn observation(&self) -> &str {
        match self {
            ToolOutcome::Success(text) | ToolOutcome::Failed(text) => text,
        }
    }

    pub fn into_observation(self) -> String {
        match self {
            ToolOutcome::Success(text) | ToolOutcome::Failed(text) => text,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ToolOutcome::Failed(_))
    }
}

/// Runs `tool`, turning an error or a panic inside the tool into a
/// [`ToolOutcome::Failed`] observation instead of failing the session.
pub async fn invoke_tool(tool: &dyn Tool, input: &str) -> ToolOutcome {
    let name = tool.name();
    match AssertUnwindSafe(tool.invoke(input)).catch_unwind().await {
        Ok(Ok(output)) => ToolOutcome::Success(output),
        Ok(Err(err)) => {
            warn!(tool = %name, error = %err, "tool execution failed");
            ToolOutcome::Failed(format!("Tool '{name}' failed: {err}"))
        }
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            warn!(tool = %name, reason = %reason, "tool panicked");
            ToolOutcome::Failed(format!("Tool '{name}' panicked: {reason}"))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
