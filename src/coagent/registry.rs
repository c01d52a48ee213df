// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::adk::agent::{Agent, AgentDescriptor, ExecuteRequest, FrameStream};
use crate::adk::error::{CoagentError, Result};

/// Agents available to the service layer, by name
#[derive(Clone)]
pub struct AgentRegistry {
    agents: Arc<RwLock<HashMap<String, Arc<dyn Agent>>>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register an agent, replacing any agent already using its name
    pub async fn register(&self, agent: Arc<dyn Agent>) {
        let mut agents = self.agents.write().await;
        if agents.insert(agent.name().to_string(), agent.clone()).is_some() {
            log::warn!("Replaced previously registered agent {}", agent.name());
        }
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Agent>> {
        let agents = self.agents.read().await;
        agents.get(name).cloned()
    }

    /// Descriptors of every registered agent, sorted by name
    pub async fn descriptors(&self) -> Vec<AgentDescriptor> {
        let agents = self.agents.read().await;
        let mut descriptors: Vec<AgentDescriptor> =
            agents.values().map(|agent| agent.descriptor()).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    pub async fn execute(&self, name: &str, request: ExecuteRequest) -> Result<FrameStream> {
        let agent = self
            .get(name)
            .await
            .ok_or_else(|| CoagentError::agent_not_found(name))?;
        agent.execute(request).await
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::StreamExt;
    use serde_json::json;

    /// Answers every request with a fixed line
    struct MockAgent {
        name: String,
        description: Option<String>,
    }

    impl MockAgent {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                description: Some(format!("Mock agent: {}", name)),
            }
        }
    }

    #[async_trait]
    impl Agent for MockAgent {
        fn name(&self) -> &str {
            &self.name
        }

        fn description(&self) -> Option<&str> {
            self.description.as_deref()
        }

        async fn execute(&self, _request: ExecuteRequest) -> Result<FrameStream> {
            let line = format!("{}\n", json!({"agent": self.name}));
            Ok(Box::pin(futures::stream::iter(vec![Ok(line)])))
        }
    }

    #[tokio::test]
    async fn test_register_and_get() {
        let registry = AgentRegistry::new();
        registry.register(Arc::new(MockAgent::new("weather"))).await;

        let agent = registry.get("weather").await.unwrap();
        assert_eq!(agent.name(), "weather");
        assert_eq!(agent.description(), Some("Mock agent: weather"));
        assert!(registry.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_descriptors_sorted() {
        let registry = AgentRegistry::default();
        registry.register(Arc::new(MockAgent::new("weather"))).await;
        registry.register(Arc::new(MockAgent::new("books"))).await;

        let names: Vec<String> = registry
            .descriptors()
            .await
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["books", "weather"]);
    }

    #[tokio::test]
    async fn test_register_replaces_same_name() {
        let registry = AgentRegistry::new();
        registry.register(Arc::new(MockAgent::new("weather"))).await;
        registry.register(Arc::new(MockAgent::new("weather"))).await;
        assert_eq!(registry.descriptors().await.len(), 1);
    }

    #[tokio::test]
    async fn test_execute_routes_by_name() {
        let registry = AgentRegistry::new();
        registry.register(Arc::new(MockAgent::new("weather"))).await;

        let lines: Vec<String> = registry
            .execute("weather", ExecuteRequest::new(json!({})))
            .await
            .unwrap()
            .map(|line| line.unwrap())
            .collect()
            .await;
        assert_eq!(lines, vec!["{\"agent\":\"weather\"}\n"]);
    }

    #[tokio::test]
    async fn test_execute_unknown_agent() {
        let registry = AgentRegistry::new();
        let result = registry.execute("ghost", ExecuteRequest::new(json!({}))).await;
        assert!(matches!(
            result,
            Err(CoagentError::AgentNotFound { name }) if name == "ghost"
        ));
    }
}
