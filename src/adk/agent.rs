// SPDX-License-Identifier: MIT

//! Agent contract exposed to the surrounding service layer
//!
//! An agent is invoked with the client's view of state plus the inbound
//! conversation and answers with a lazy stream of line-delimited frames.

use async_trait::async_trait;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;

use crate::adk::action::Action;
use crate::adk::error::Result;
use crate::adk::message::Message;

/// Serialized frames, each terminated by `\n`
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Static catalog entry for an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<String>,
}

impl AgentDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            agent_type: None,
        }
    }

    pub fn with_type(mut self, agent_type: impl Into<String>) -> Self {
        self.agent_type = Some(agent_type.into());
        self
    }
}

/// One invocation of an agent
#[derive(Debug, Clone, Default)]
pub struct ExecuteRequest {
    /// The client's current view of agent state
    pub state: Value,
    pub messages: Vec<Message>,
    /// Thread to continue; a fresh one is generated when absent
    pub thread_id: Option<String>,
    /// Node the client last saw the thread at
    pub node_name: Option<String>,
    pub actions: Vec<Action>,
}

impl ExecuteRequest {
    pub fn new(state: Value) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_node(mut self, node_name: impl Into<String>) -> Self {
        self.node_name = Some(node_name.into());
        self
    }

    pub fn with_actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = actions;
        self
    }
}

/// Core agent trait for all agent types
#[async_trait]
pub trait Agent: Send + Sync {
    /// Returns the agent name
    fn name(&self) -> &str;

    fn description(&self) -> Option<&str>;

    /// Catalog entry for this agent
    fn descriptor(&self) -> AgentDescriptor {
        AgentDescriptor::new(self.name(), self.description().unwrap_or_default())
    }

    /// Run the agent, streaming serialized frames back to the caller
    async fn execute(&self, request: ExecuteRequest) -> Result<FrameStream>;
}
