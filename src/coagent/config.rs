// SPDX-License-Identifier: MIT

//! Agent configuration - YAML file loading and environment overrides

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use crate::adk::error::{CoagentError, Result};

/// Metadata key under which a node publishes its emit-state directive
pub const DEFAULT_EMIT_STATE_KEY: &str = "copilotkit:emit-state";

/// State key holding the action catalog attached at run start
pub const DEFAULT_ACTIONS_STATE_KEY: &str = "copilotkit";

pub const ENV_AGENT_NAME: &str = "COAGENT_AGENT_NAME";
pub const ENV_EMIT_STATE_KEY: &str = "COAGENT_EMIT_STATE_KEY";

/// Keys the synchronization layer reads and writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default = "default_emit_state_key")]
    pub emit_state_key: String,
    #[serde(default = "default_actions_state_key")]
    pub actions_state_key: String,
}

fn default_emit_state_key() -> String {
    DEFAULT_EMIT_STATE_KEY.to_string()
}

fn default_actions_state_key() -> String {
    DEFAULT_ACTIONS_STATE_KEY.to_string()
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            emit_state_key: default_emit_state_key(),
            actions_state_key: default_actions_state_key(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSection {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoagentConfig {
    pub agent: AgentSection,
    #[serde(default)]
    pub sync: SyncSettings,
}

impl CoagentConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            agent: AgentSection {
                name: name.into(),
                description: None,
            },
            sync: SyncSettings::default(),
        }
    }

    /// Apply `COAGENT_*` environment overrides
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            env::var(ENV_AGENT_NAME).ok(),
            env::var(ENV_EMIT_STATE_KEY).ok(),
        )
    }

    fn with_overrides(mut self, name: Option<String>, emit_state_key: Option<String>) -> Self {
        if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
            log::debug!("Agent name overridden from environment: {}", name);
            self.agent.name = name;
        }
        if let Some(key) = emit_state_key.filter(|k| !k.trim().is_empty()) {
            self.sync.emit_state_key = key;
        }
        self
    }

    fn validate(self) -> Result<Self> {
        if self.agent.name.trim().is_empty() {
            return Err(CoagentError::config("agent name must not be empty"));
        }
        if self.sync.emit_state_key.is_empty() || self.sync.actions_state_key.is_empty() {
            return Err(CoagentError::config("sync keys must not be empty"));
        }
        Ok(self)
    }
}

/// Loads agent configuration from YAML files
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a configuration file, then apply environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<CoagentConfig> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CoagentError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse_yaml(&content)?.with_env_overrides().validate()
    }

    /// Parse a configuration from a YAML string
    pub fn parse_yaml(content: &str) -> Result<CoagentConfig> {
        let config: CoagentConfig = serde_yaml::from_str(content)?;
        config.validate()
    }
}
