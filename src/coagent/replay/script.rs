// SPDX-License-Identifier: MIT

//! Recorded-run script format
//!
//! ```yaml
//! nodes: [outline, write]
//! initial_state: {}
//! steps:
//!   - event: {event: on_chain_start, name: outline, run_id: r1}
//!   - state: {outline: "A fox"}
//!     event: {event: on_chain_end, name: outline, run_id: r1}
//!   - error: "upstream model timed out"
//! end:
//!   next: []
//!   writes: {outline: {outline: "A fox"}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use crate::adk::engine::EngineEvent;
use crate::adk::error::Result;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReplayScript {
    /// Top-level node names of the recorded graph
    #[serde(default)]
    pub nodes: Vec<String>,
    /// State of a thread the engine has not seen yet
    #[serde(default)]
    pub initial_state: Value,
    #[serde(default)]
    pub steps: Vec<ReplayStep>,
    #[serde(default)]
    pub end: ReplayEnd,
}

/// One recorded step. The state patch lands before the event is delivered.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReplayStep {
    #[serde(default)]
    pub state: Option<Map<String, Value>>,
    #[serde(default)]
    pub event: Option<EngineEvent>,
    /// Fail the event stream here
    #[serde(default)]
    pub error: Option<String>,
}

/// End-of-run metadata recorded for the thread
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReplayEnd {
    #[serde(default)]
    pub next: Vec<String>,
    #[serde(default)]
    pub writes: Option<Map<String, Value>>,
}

impl ReplayScript {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let script: ReplayScript = serde_yaml::from_str(content)?;
        Ok(script)
    }
}
