// SPDX-License-Identifier: MIT

//! In-memory execution engine replaying a recorded run

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use super::script::ReplayScript;
use crate::adk::engine::{
    EventStream, ExecutionEngine, RunConfig, SnapshotMetadata, StateSnapshot,
};
use crate::adk::error::EngineError;

/// A state write pushed through [`ExecutionEngine::update_state`]
#[derive(Debug, Clone, PartialEq)]
pub struct StateUpdate {
    pub thread_id: String,
    pub as_node: Option<String>,
    pub values: Value,
}

#[derive(Debug, Clone)]
struct ThreadState {
    values: Value,
    next: Vec<String>,
    writes: Option<Map<String, Value>>,
}

type Threads = Arc<RwLock<HashMap<String, ThreadState>>>;

/// Replays the same recorded run for every thread it is asked to execute.
///
/// Thread state lives in memory: starting a run replaces it with the input,
/// resuming keeps whatever `update_state` wrote.
pub struct ScriptedEngine {
    nodes: HashSet<String>,
    script: Arc<ReplayScript>,
    threads: Threads,
    inputs: Mutex<Vec<Option<Value>>>,
    updates: Mutex<Vec<StateUpdate>>,
}

impl ScriptedEngine {
    pub fn new(script: ReplayScript) -> Self {
        Self {
            nodes: script.nodes.iter().cloned().collect(),
            script: Arc::new(script),
            threads: Arc::new(RwLock::new(HashMap::new())),
            inputs: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
        }
    }

    /// Inputs passed to each `stream_events` call, in call order
    pub fn inputs(&self) -> Vec<Option<Value>> {
        self.inputs.lock().map(|i| i.clone()).unwrap_or_default()
    }

    /// Writes received through `update_state`, in call order
    pub fn updates(&self) -> Vec<StateUpdate> {
        self.updates.lock().map(|u| u.clone()).unwrap_or_default()
    }

    fn fresh_thread(script: &ReplayScript) -> ThreadState {
        let values = match &script.initial_state {
            Value::Null => Value::Object(Map::new()),
            other => other.clone(),
        };
        ThreadState {
            values,
            next: Vec::new(),
            writes: None,
        }
    }
}

fn poisoned(what: &str) -> EngineError {
    EngineError::State(format!("{} lock poisoned", what))
}

/// Apply `update` to a thread without holding the lock past the call
fn with_thread(
    threads: &Threads,
    thread_id: &str,
    update: impl FnOnce(&mut ThreadState),
) -> Result<(), EngineError> {
    let mut guard = threads.write().map_err(|_| poisoned("thread"))?;
    if let Some(thread) = guard.get_mut(thread_id) {
        update(thread);
    }
    Ok(())
}

fn merge_values(target: &mut Value, patch: Map<String, Value>) {
    match target {
        Value::Object(values) => values.extend(patch),
        other => *other = Value::Object(patch),
    }
}

#[async_trait]
impl ExecutionEngine for ScriptedEngine {
    fn node_names(&self) -> &HashSet<String> {
        &self.nodes
    }

    async fn stream_events(
        &self,
        input: Option<Value>,
        config: &RunConfig,
    ) -> Result<EventStream, EngineError> {
        self.inputs
            .lock()
            .map_err(|_| poisoned("input log"))?
            .push(input.clone());

        {
            let mut threads = self.threads.write().map_err(|_| poisoned("thread"))?;
            let thread = threads
                .entry(config.thread_id.clone())
                .or_insert_with(|| Self::fresh_thread(&self.script));
            if let Some(input) = input {
                thread.values = input;
            }
            thread.next = self.script.nodes.iter().take(1).cloned().collect();
            thread.writes = None;
        }

        let script = self.script.clone();
        let threads = self.threads.clone();
        let thread_id = config.thread_id.clone();

        Ok(Box::pin(async_stream::stream! {
            for step in &script.steps {
                if let Some(patch) = &step.state {
                    if let Err(e) = with_thread(&threads, &thread_id, |thread| {
                        merge_values(&mut thread.values, patch.clone())
                    }) {
                        yield Err(e);
                        return;
                    }
                }
                if let Some(message) = &step.error {
                    yield Err(EngineError::Stream(message.clone()));
                    return;
                }
                if let Some(event) = &step.event {
                    yield Ok(event.clone());
                }
            }

            if let Err(e) = with_thread(&threads, &thread_id, |thread| {
                thread.next = script.end.next.clone();
                thread.writes = script.end.writes.clone();
            }) {
                yield Err(e);
            }
        }))
    }

    fn get_state(&self, config: &RunConfig) -> Result<StateSnapshot, EngineError> {
        let threads = self.threads.read().map_err(|_| poisoned("thread"))?;
        let thread = threads
            .get(&config.thread_id)
            .cloned()
            .unwrap_or_else(|| Self::fresh_thread(&self.script));

        Ok(StateSnapshot {
            values: thread.values,
            next: thread.next,
            metadata: SnapshotMetadata {
                writes: thread.writes,
                step: None,
            },
        })
    }

    async fn update_state(
        &self,
        config: &RunConfig,
        values: Value,
        as_node: Option<&str>,
    ) -> Result<(), EngineError> {
        let Value::Object(patch) = values.clone() else {
            return Err(EngineError::Checkpoint(
                "state update must be an object".to_string(),
            ));
        };

        {
            let mut threads = self.threads.write().map_err(|_| poisoned("thread"))?;
            let thread = threads
                .entry(config.thread_id.clone())
                .or_insert_with(|| Self::fresh_thread(&self.script));
            merge_values(&mut thread.values, patch);
            if let Some(node) = as_node {
                let mut writes = Map::new();
                writes.insert(node.to_string(), values.clone());
                thread.writes = Some(writes);
            }
        }

        self.updates
            .lock()
            .map_err(|_| poisoned("update log"))?
            .push(StateUpdate {
                thread_id: config.thread_id.clone(),
                as_node: as_node.map(str::to_string),
                values,
            });
        Ok(())
    }
}
