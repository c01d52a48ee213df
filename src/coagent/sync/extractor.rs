// SPDX-License-Identifier: MIT

//! Mirrors in-flight tool-call arguments into client-visible state

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::convert::TryFrom;

use crate::adk::engine::{EngineEvent, ToolCallChunk};
use crate::coagent::partial_json;

/// Where a mirrored state key takes its value from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitStateTarget {
    /// Tool whose arguments are mirrored
    pub tool: String,
    /// Single argument to select; the whole argument object when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument: Option<String>,
}

impl EmitStateTarget {
    pub fn tool(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            argument: None,
        }
    }

    pub fn argument(tool: impl Into<String>, argument: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            argument: Some(argument.into()),
        }
    }
}

/// Emit-state directive: logical state key -> tool call to mirror.
///
/// Entries keep the order they were declared in.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct EmitStateDirective(Vec<(String, EmitStateTarget)>);

impl TryFrom<Map<String, Value>> for EmitStateDirective {
    type Error = serde_json::Error;

    fn try_from(entries: Map<String, Value>) -> Result<Self, Self::Error> {
        entries
            .into_iter()
            .map(|(key, target)| Ok((key, serde_json::from_value(target)?)))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl EmitStateDirective {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, state_key: impl Into<String>, target: EmitStateTarget) -> Self {
        let state_key = state_key.into();
        match self.0.iter_mut().find(|(key, _)| *key == state_key) {
            Some(entry) => entry.1 = target,
            None => self.0.push((state_key, target)),
        }
        self
    }

    /// Read the directive stored under `key` in an event's metadata.
    ///
    /// Absent, empty or malformed directives all read as "no directive".
    pub fn from_metadata(metadata: &Map<String, Value>, key: &str) -> Option<Self> {
        let raw = metadata.get(key)?;
        if raw.is_null() {
            return None;
        }
        match serde_json::from_value::<Self>(raw.clone()) {
            Ok(directive) if !directive.is_empty() => Some(directive),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Ignoring malformed emit-state directive: {}", e);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First declared state key mirroring `tool`
    pub fn target_for(&self, tool: &str) -> Option<(&str, &EmitStateTarget)> {
        self.0
            .iter()
            .find(|(_, target)| target.tool == tool)
            .map(|(key, target)| (key.as_str(), target))
    }
}

/// Buffers tool-call argument text for one generative step and turns it
/// into best-effort state values.
#[derive(Debug, Default)]
pub struct StreamingStateExtractor {
    directive: EmitStateDirective,
    /// Raw argument text per tool name
    buffers: BTreeMap<String, String>,
    current_tool: Option<String>,
    /// Last value that parsed for each tool, used while the live text is unparsable
    last_parsed: HashMap<String, Value>,
}

impl StreamingStateExtractor {
    pub fn new(directive: EmitStateDirective) -> Self {
        Self {
            directive,
            ..Self::default()
        }
    }

    /// Buffer the tool-call fragment carried by a generation chunk event
    pub fn buffer_event(&mut self, event: &EngineEvent) {
        let chunks = event.tool_call_chunks();
        if let Some(chunk) = chunks.first() {
            self.buffer_chunk(chunk);
        }
    }

    /// A named fragment starts a new call; an unnamed one continues the current call
    pub fn buffer_chunk(&mut self, chunk: &ToolCallChunk) {
        let args = chunk.args.as_deref().unwrap_or_default();
        match (&chunk.name, &self.current_tool) {
            (Some(name), _) => {
                self.current_tool = Some(name.clone());
                self.buffers.insert(name.clone(), args.to_string());
            }
            (None, Some(current)) => {
                if let Some(buffer) = self.buffers.get_mut(current) {
                    buffer.push_str(args);
                }
            }
            (None, None) => {
                log::debug!("Dropping tool-call fragment without a preceding tool name");
            }
        }
    }

    /// State values extracted from every mirrored tool call buffered so far
    pub fn extract_state(&mut self) -> Map<String, Value> {
        let mut state = Map::new();

        for (tool, text) in &self.buffers {
            let Some((state_key, target)) = self.directive.target_for(tool) else {
                continue;
            };

            let parsed = match partial_json::parse(text) {
                Ok(value) => {
                    self.last_parsed.insert(tool.clone(), value.clone());
                    value
                }
                Err(e) => match self.last_parsed.get(tool) {
                    Some(previous) => {
                        log::debug!("Arguments for {} unparsable ({}), reusing last value", tool, e);
                        previous.clone()
                    }
                    None => continue,
                },
            };

            let value = match &target.argument {
                Some(argument) => parsed.get(argument).cloned(),
                None => Some(parsed),
            };
            if let Some(value) = value {
                state.insert(state_key.to_string(), value);
            }
        }

        state
    }
}
