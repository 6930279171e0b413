use std::collections::HashMap;

use ponder_core::{PonderError, Value};
use regex::{Captures, Regex};

use crate::REACT_TEMPLATE;

const PLACEHOLDER_PATTERN: &str = r"\{\{|\}\}|\{(\w+)\}";

/// A text template with `{name}` slots. `{{` and `}}` render as literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn react() -> Self {
        Self::new(REACT_TEMPLATE)
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Slot names in order of first appearance.
    pub fn input_variables(&self) -> Result<Vec<String>, PonderError> {
        let pattern = placeholder_pattern()?;
        let mut names: Vec<String> = Vec::new();
        for caps in pattern.captures_iter(&self.template) {
            if let Some(name) = caps.get(1) {
                if !names.iter().any(|seen| seen == name.as_str()) {
                    names.push(name.as_str().to_string());
                }
            }
        }
        Ok(names)
    }

    /// Fails unless every name in `required` appears as a slot.
    pub fn require(&self, required: &[&str]) -> Result<(), PonderError> {
        let defined = self.input_variables()?;
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|name| !defined.iter().any(|slot| slot == name))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PonderError::InvalidConfig(format!(
                "prompt template is missing slot(s): {}",
                missing.join(", ")
            )))
        }
    }

    /// Substitutes every slot verbatim. A slot without a binding is an error.
    pub fn render(&self, vars: &HashMap<String, Value>) -> Result<String, PonderError> {
        let pattern = placeholder_pattern()?;
        let mut missing: Option<String> = None;
        let rendered = pattern.replace_all(&self.template, |caps: &Captures| {
            let Some(key) = caps.get(1) else {
                return caps[0][..1].to_string();
            };
            match vars.get(key.as_str()) {
                Some(value) => value
                    .as_str()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| value.to_string()),
                None => {
                    missing.get_or_insert_with(|| key.as_str().to_string());
                    String::new()
                }
            }
        });
        match missing {
            Some(key) => Err(PonderError::InvalidConfig(format!(
                "missing value for prompt variable '{key}'"
            ))),
            None => Ok(rendered.into_owned()),
        }
    }
}

fn placeholder_pattern() -> Result<Regex, PonderError> {
    Regex::new(PLACEHOLDER_PATTERN).map_err(|e| PonderError::InvalidConfig(e.to_string()))
}
