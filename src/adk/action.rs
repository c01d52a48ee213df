// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

/// A frontend-declared action made available to the agent.
///
/// Actions are data only here: the run controller attaches the catalog to
/// state so graph nodes can offer them as tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ActionParameter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionParameter {
    pub name: String,
    #[serde(rename = "type", default = "default_parameter_type")]
    pub param_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_parameter_type() -> String {
    "string".to_string()
}

fn default_required() -> bool {
    true
}

impl Action {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: ActionParameter) -> Self {
        self.parameters.push(parameter);
        self
    }
}

impl ActionParameter {
    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: default_parameter_type(),
            description: Some(description.into()),
            required: true,
        }
    }
}
