// SPDX-License-Identifier: MIT

//! Typed error handling for coagent-rs
//!
//! Fatal run errors are carried by [`CoagentError`]. Incomplete tool-call
//! text is not an error at this level; the extractor absorbs it.

use thiserror::Error;

/// Top-level error type for coagent-rs
#[derive(Debug, Error)]
pub enum CoagentError {
    /// Failures reported by the execution engine
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// The state merge callback rejected the inbound state/messages
    #[error("State merge failed: {0}")]
    MergeState(String),

    /// No agent registered under the requested name
    #[error("Agent '{name}' not found")]
    AgentNotFound { name: String },

    /// Configuration errors (bad settings file, invalid values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors raised by an [`ExecutionEngine`](crate::adk::engine::ExecutionEngine)
#[derive(Debug, Error)]
pub enum EngineError {
    /// The event stream itself failed mid-run
    #[error("event stream failed: {0}")]
    Stream(String),

    /// The current-state query failed
    #[error("state query failed: {0}")]
    State(String),

    /// Writing state into the thread checkpoint failed
    #[error("checkpoint update failed: {0}")]
    Checkpoint(String),
}

impl CoagentError {
    /// Create a merge error
    pub fn merge_state(message: impl Into<String>) -> Self {
        Self::MergeState(message.into())
    }

    /// Create an agent not found error
    pub fn agent_not_found(name: impl Into<String>) -> Self {
        Self::AgentNotFound { name: name.into() }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

pub type Result<T, E = CoagentError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_wraps_into_coagent_error() {
        let err: CoagentError = EngineError::Stream("socket closed".into()).into();
        assert!(matches!(err, CoagentError::Engine(EngineError::Stream(_))));
        assert_eq!(
            err.to_string(),
            "Engine error: event stream failed: socket closed"
        );
    }

    #[test]
    fn test_config_helper() {
        let err = CoagentError::config("sync keys must not be empty");
        assert!(matches!(err, CoagentError::Config(_)));
        assert_eq!(err.to_string(), "Configuration error: sync keys must not be empty");
    }

    #[test]
    fn test_agent_not_found_message() {
        let err = CoagentError::agent_not_found("bookAgent");
        assert_eq!(err.to_string(), "Agent 'bookAgent' not found");
    }
}
