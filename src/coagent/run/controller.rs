// SPDX-License-Identifier: MIT

//! Graph-backed agent driving one engine run per request

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use super::merge::{merge_state, MergeStateFn};
use super::mode::RunMode;
use crate::adk::agent::{Agent, AgentDescriptor, ExecuteRequest, FrameStream};
use crate::adk::engine::{ExecutionEngine, RunConfig};
use crate::adk::error::Result;
use crate::coagent::config::{CoagentConfig, SyncSettings};
use crate::coagent::sync::EventStreamTranslator;

/// Descriptor type reported for graph agents
pub const GRAPH_AGENT_TYPE: &str = "langgraph";

/// Agent that runs a compiled graph and keeps the client's view of its state in sync
pub struct GraphAgent {
    name: String,
    description: Option<String>,
    engine: Arc<dyn ExecutionEngine>,
    /// Custom merge; the default one follows `settings.actions_state_key`
    merge_state: Option<MergeStateFn>,
    settings: SyncSettings,
}

impl GraphAgent {
    /// Create a new GraphAgent
    pub fn new(name: impl Into<String>, engine: Arc<dyn ExecutionEngine>) -> Self {
        Self {
            name: name.into(),
            description: None,
            engine,
            merge_state: None,
            settings: SyncSettings::default(),
        }
    }

    /// Build from a loaded configuration file
    pub fn from_config(config: &CoagentConfig, engine: Arc<dyn ExecutionEngine>) -> Self {
        let mut agent = Self::new(config.agent.name.clone(), engine).with_settings(config.sync.clone());
        agent.description = config.agent.description.clone();
        agent
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replace the merge callback
    pub fn with_merge_state(mut self, merge_state: MergeStateFn) -> Self {
        self.merge_state = Some(merge_state);
        self
    }

    /// Use different sync keys. A custom merge callback is kept as is.
    pub fn with_settings(mut self, settings: SyncSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }
}

#[async_trait]
impl Agent for GraphAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn descriptor(&self) -> AgentDescriptor {
        AgentDescriptor::new(&self.name, self.description().unwrap_or_default())
            .with_type(GRAPH_AGENT_TYPE)
    }

    async fn execute(&self, request: ExecuteRequest) -> Result<FrameStream> {
        let ExecuteRequest {
            state,
            messages,
            thread_id,
            node_name,
            actions,
        } = request;

        let merged = match &self.merge_state {
            Some(custom) => custom(&state, &messages, &actions)?,
            None => merge_state(&state, &messages, &actions, &self.settings.actions_state_key)?,
        };

        let thread_id = thread_id.filter(|id| !id.is_empty());
        let mode = RunMode::select(thread_id.as_deref(), node_name.as_deref());
        let thread_id = thread_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let config = RunConfig::new(thread_id);

        log::info!(
            "Agent {} running thread {} in {} mode (node: {:?})",
            self.name,
            config.thread_id,
            mode.as_str(),
            node_name
        );

        let (input, seed_node) = match mode {
            RunMode::Start => (Some(merged.clone()), None),
            RunMode::Continue => {
                self.engine
                    .update_state(&config, merged.clone(), node_name.as_deref())
                    .await?;
                (None, node_name)
            }
        };

        let translator = EventStreamTranslator::new(
            self.engine.clone(),
            config,
            self.name.clone(),
            self.settings.emit_state_key.clone(),
            merged,
            seed_node,
        );
        Ok(translator.into_stream(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::action::Action;
    use crate::adk::error::CoagentError;
    use crate::adk::message::Message;
    use crate::coagent::replay::{ReplayScript, ScriptedEngine};
    use futures::StreamExt;
    use serde_json::{json, Value};

    const SCRIPT: &str = r#"
nodes: [outline]
steps:
  - event: {event: on_chain_start, name: outline, run_id: r1}
  - state: {outline: "A fox"}
    event: {event: on_chain_end, name: outline, run_id: r1}
"#;

    fn scripted() -> Arc<ScriptedEngine> {
        Arc::new(ScriptedEngine::new(ReplayScript::from_yaml(SCRIPT).unwrap()))
    }

    async fn run(agent: &GraphAgent, request: ExecuteRequest) -> Vec<Value> {
        let stream = agent.execute(request).await.unwrap();
        stream
            .map(|line| serde_json::from_str(line.unwrap().trim_end()).unwrap())
            .collect()
            .await
    }

    #[test]
    fn test_descriptor() {
        let agent = GraphAgent::new("bookAgent", scripted()).with_description("Writes books");
        let descriptor = serde_json::to_value(agent.descriptor()).unwrap();
        assert_eq!(
            descriptor,
            json!({"name": "bookAgent", "description": "Writes books", "type": "langgraph"})
        );
    }

    #[tokio::test]
    async fn test_start_generates_thread_and_passes_input() {
        let engine = scripted();
        let agent = GraphAgent::new("bookAgent", engine.clone());
        let frames = run(
            &agent,
            ExecuteRequest::new(json!({})).with_messages(vec![Message::user("m1", "Hi")]),
        )
        .await;

        let thread_id = frames[0]["thread_id"].as_str().unwrap();
        assert!(Uuid::parse_str(thread_id).is_ok());
        assert!(frames.iter().all(|f| f.get("thread_id").map_or(true, |t| t == thread_id)));

        let inputs = engine.inputs();
        assert_eq!(inputs.len(), 1);
        let input = inputs[0].as_ref().unwrap();
        assert_eq!(input["messages"][0]["id"], json!("m1"));
        assert!(engine.updates().is_empty());
    }

    #[tokio::test]
    async fn test_continue_writes_checkpoint_first() {
        let engine = scripted();
        let agent = GraphAgent::new("bookAgent", engine.clone());
        run(
            &agent,
            ExecuteRequest::new(json!({"title": "Fox"}))
                .with_thread("t1")
                .with_node("outline"),
        )
        .await;

        let updates = engine.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].thread_id, "t1");
        assert_eq!(updates[0].as_node.as_deref(), Some("outline"));
        assert_eq!(updates[0].values["title"], json!("Fox"));
        assert_eq!(engine.inputs(), vec![None]);
    }

    #[tokio::test]
    async fn test_finished_thread_restarts() {
        let engine = scripted();
        let agent = GraphAgent::new("bookAgent", engine.clone());
        let frames = run(
            &agent,
            ExecuteRequest::new(json!({})).with_thread("t1").with_node("__end__"),
        )
        .await;

        assert!(engine.updates().is_empty());
        assert!(engine.inputs()[0].is_some());
        assert_eq!(frames[0]["thread_id"], json!("t1"));
    }

    #[tokio::test]
    async fn test_node_seed_only_in_continue_mode() {
        const MODEL_FIRST: &str = r#"
nodes: [outline]
steps:
  - event: {event: on_chat_model_start, name: model, run_id: r1}
  - event: {event: on_chain_start, name: outline, run_id: r1}
"#;
        let scripted =
            || Arc::new(ScriptedEngine::new(ReplayScript::from_yaml(MODEL_FIRST).unwrap()));

        let agent = GraphAgent::new("bookAgent", scripted());
        let frames = run(
            &agent,
            ExecuteRequest::new(json!({})).with_thread("t1").with_node("__end__"),
        )
        .await;
        assert_eq!(frames[0]["event"], json!("on_chat_model_start"));

        let agent = GraphAgent::new("bookAgent", scripted());
        let frames = run(
            &agent,
            ExecuteRequest::new(json!({})).with_thread("t1").with_node("outline"),
        )
        .await;
        assert_eq!(frames[0]["event"], json!("on_copilotkit_state_sync"));
        assert_eq!(frames[0]["node_name"], json!("outline"));
        assert_eq!(frames[1]["event"], json!("on_chat_model_start"));
    }

    #[tokio::test]
    async fn test_merge_failure_is_fatal() {
        let agent = GraphAgent::new("bookAgent", scripted());
        let result = agent.execute(ExecuteRequest::new(json!("not an object"))).await;
        assert!(matches!(result, Err(CoagentError::MergeState(_))));
    }

    #[tokio::test]
    async fn test_custom_merge_state() {
        let engine = scripted();
        let agent = GraphAgent::new("bookAgent", engine.clone())
            .with_merge_state(Arc::new(|state: &Value, _: &[Message], _: &[Action]| {
                Ok(json!({"wrapped": state.clone()}))
            }));
        run(&agent, ExecuteRequest::new(json!({"a": 1}))).await;
        assert_eq!(engine.inputs()[0], Some(json!({"wrapped": {"a": 1}})));
    }

    #[tokio::test]
    async fn test_custom_merge_survives_settings_change() {
        let engine = scripted();
        let settings = SyncSettings {
            actions_state_key: "ui".to_string(),
            ..SyncSettings::default()
        };
        let agent = GraphAgent::new("bookAgent", engine.clone())
            .with_merge_state(Arc::new(|state: &Value, _: &[Message], _: &[Action]| {
                Ok(json!({"wrapped": state.clone()}))
            }))
            .with_settings(settings);
        run(&agent, ExecuteRequest::new(json!({"a": 1}))).await;
        assert_eq!(engine.inputs()[0], Some(json!({"wrapped": {"a": 1}})));
        assert_eq!(agent.settings().actions_state_key, "ui");
    }

    #[tokio::test]
    async fn test_settings_move_actions_key() {
        let engine = scripted();
        let settings = SyncSettings {
            actions_state_key: "ui".to_string(),
            ..SyncSettings::default()
        };
        let agent = GraphAgent::new("bookAgent", engine.clone()).with_settings(settings);
        run(&agent, ExecuteRequest::new(json!({}))).await;
        let input = engine.inputs()[0].clone().unwrap();
        assert_eq!(input["ui"], json!({"actions": []}));
    }
}
