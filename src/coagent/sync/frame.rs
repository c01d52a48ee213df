// SPDX-License-Identifier: MIT

//! Output frames and their line framing

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adk::engine::EngineEvent;
use crate::adk::error::Result;

/// Event name carried by synthesized state-sync frames
pub const STATE_SYNC_EVENT: &str = "on_copilotkit_state_sync";

/// Synthesized snapshot of the agent's state for the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSyncFrame {
    pub event: String,
    pub thread_id: String,
    pub run_id: Option<String>,
    pub agent_name: String,
    pub node_name: String,
    /// False exactly when the frame reports the node's own completion
    pub active: bool,
    pub state: Value,
    pub running: bool,
    pub role: String,
}

impl StateSyncFrame {
    pub fn new(
        thread_id: impl Into<String>,
        run_id: Option<String>,
        agent_name: impl Into<String>,
        node_name: impl Into<String>,
        state: Value,
    ) -> Self {
        Self {
            event: STATE_SYNC_EVENT.to_string(),
            thread_id: thread_id.into(),
            run_id,
            agent_name: agent_name.into(),
            node_name: node_name.into(),
            active: true,
            state,
            running: true,
            role: "assistant".to_string(),
        }
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn running(mut self, running: bool) -> Self {
        self.running = running;
        self
    }
}

/// One element of the client-facing stream
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    StateSync(StateSyncFrame),
    /// The engine event, forwarded unchanged
    Event(EngineEvent),
}

impl Frame {
    /// Serialize as a single JSON line terminated by `\n`
    pub fn to_line(&self) -> Result<String> {
        let mut line = match self {
            Frame::StateSync(frame) => serde_json::to_string(frame)?,
            Frame::Event(event) => serde_json::to_string(event)?,
        };
        line.push('\n');
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::engine::EventKind;
    use serde_json::json;

    #[test]
    fn test_state_sync_line_layout() {
        let frame = StateSyncFrame::new(
            "thread-1",
            Some("run-1".to_string()),
            "bookAgent",
            "outline",
            json!({"outline": "A fox"}),
        )
        .active(false);

        let line = Frame::StateSync(frame).to_line().unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);

        let value: Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "on_copilotkit_state_sync",
                "thread_id": "thread-1",
                "run_id": "run-1",
                "agent_name": "bookAgent",
                "node_name": "outline",
                "active": false,
                "state": {"outline": "A fox"},
                "running": true,
                "role": "assistant"
            })
        );
    }

    #[test]
    fn test_passthrough_line_is_faithful() {
        let event = EngineEvent::new(EventKind::ChainEnd, "outline", "run-7")
            .with_metadata("langgraph_step", json!(2))
            .with_data(json!({"output": {"text": "multi\nline"}}));

        let line = Frame::Event(event.clone()).to_line().unwrap();
        assert_eq!(line.matches('\n').count(), 1);

        let decoded: EngineEvent = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_passthrough_keeps_unknown_fields() {
        let raw = r#"{"event":"on_chain_start","name":"outline","run_id":"run-7","metadata":{"langgraph_node":"outline"},"data":{},"tags":[],"parent_ids":["run-1"]}"#;
        let event: EngineEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.extra["tags"], json!([]));

        let line = Frame::Event(event).to_line().unwrap();
        assert_eq!(line, format!("{}\n", raw));
    }
}
