// SPDX-License-Identifier: MIT

//! Execution-engine capability consumed by the synchronization layer.
//!
//! Any graph-execution backend can drive a run as long as it can produce an
//! ordered event stream, answer "what is the state now", and accept a state
//! write attributed to a node before resuming a thread.

use async_trait::async_trait;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::pin::Pin;

use crate::adk::error::EngineError;

/// Node name the engine reports once a run has nothing left to execute
pub const END_NODE: &str = "__end__";

/// Ordered, fallible stream of engine events for one run
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EngineEvent, EngineError>> + Send>>;

/// Configuration identifying which thread checkpoint a call refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub thread_id: String,
}

impl RunConfig {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
        }
    }
}

/// Known event kinds; anything else is carried through untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    ChainStart,
    ChainStream,
    ChainEnd,
    ChatModelStart,
    ChatModelStream,
    ChatModelEnd,
    ToolStart,
    ToolEnd,
    Other(String),
}

impl EventKind {
    pub fn parse(kind: &str) -> Self {
        match kind {
            "on_chain_start" => Self::ChainStart,
            "on_chain_stream" => Self::ChainStream,
            "on_chain_end" => Self::ChainEnd,
            "on_chat_model_start" => Self::ChatModelStart,
            "on_chat_model_stream" => Self::ChatModelStream,
            "on_chat_model_end" => Self::ChatModelEnd,
            "on_tool_start" => Self::ToolStart,
            "on_tool_end" => Self::ToolEnd,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::ChainStart => "on_chain_start",
            Self::ChainStream => "on_chain_stream",
            Self::ChainEnd => "on_chain_end",
            Self::ChatModelStart => "on_chat_model_start",
            Self::ChatModelStream => "on_chat_model_stream",
            Self::ChatModelEnd => "on_chat_model_end",
            Self::ToolStart => "on_tool_start",
            Self::ToolEnd => "on_tool_end",
            Self::Other(kind) => kind,
        }
    }
}

/// One item from the engine's event stream.
///
/// Fields are kept in their wire form so a passthrough frame can reproduce
/// the event exactly as the engine emitted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineEvent {
    pub event: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub run_id: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub data: Value,
    /// Fields this crate does not read (`tags`, `parent_ids`, ...), passed through as received
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EngineEvent {
    pub fn new(kind: EventKind, name: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            event: kind.as_str().to_string(),
            name: name.into(),
            run_id: run_id.into(),
            metadata: Map::new(),
            data: Value::Null,
            extra: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn kind(&self) -> EventKind {
        EventKind::parse(&self.event)
    }

    /// Tool-call fragments carried by a generation chunk (`data.chunk.tool_call_chunks`)
    pub fn tool_call_chunks(&self) -> Vec<ToolCallChunk> {
        self.data
            .get("chunk")
            .and_then(|chunk| chunk.get("tool_call_chunks"))
            .and_then(|chunks| serde_json::from_value(chunks.clone()).ok())
            .unwrap_or_default()
    }
}

/// A fragment of an in-flight tool call as streamed by a generative step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallChunk {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub args: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub index: Option<u64>,
}

/// Run metadata recorded alongside a snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// Write-set of the last step, keyed by the node that produced it
    #[serde(default)]
    pub writes: Option<Map<String, Value>>,
    #[serde(default)]
    pub step: Option<i64>,
}

/// Authoritative engine state for a thread at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub values: Value,
    /// Nodes scheduled to run next; empty once the run has ended
    #[serde(default)]
    pub next: Vec<String>,
    #[serde(default)]
    pub metadata: SnapshotMetadata,
}

impl StateSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.next.is_empty()
    }

    /// First node of the last write-set, if any was recorded
    pub fn last_writer(&self) -> Option<&str> {
        self.metadata
            .writes
            .as_ref()
            .and_then(|writes| writes.keys().next())
            .map(String::as_str)
    }
}

/// Graph-execution backend driving a run
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Top-level node names declared by the graph
    fn node_names(&self) -> &HashSet<String>;

    /// Start (`input = Some`) or resume (`input = None`) the thread and stream its events
    async fn stream_events(
        &self,
        input: Option<Value>,
        config: &RunConfig,
    ) -> Result<EventStream, EngineError>;

    /// Current state snapshot for the thread
    fn get_state(&self, config: &RunConfig) -> Result<StateSnapshot, EngineError>;

    /// Write `values` into the thread checkpoint as if produced by `as_node`
    async fn update_state(
        &self,
        config: &RunConfig,
        values: Value,
        as_node: Option<&str>,
    ) -> Result<(), EngineError>;
}
