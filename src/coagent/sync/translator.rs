// SPDX-License-Identifier: MIT

//! Event stream translator
//!
//! Consumes the engine's events for one run and interleaves synthesized
//! state-sync frames with the original events. A state-sync frame is emitted
//! ahead of the event that caused it whenever:
//! - the (possibly overlaid) state differs from the last one sent,
//! - the tracked node changed, or
//! - the event is the tracked node's own completion.
//!
//! While a node carrying an emit-state directive runs, tool-call arguments
//! streamed by its generative step are parsed as they arrive and overlaid
//! onto the engine's snapshot, so the client sees state before the node has
//! written anything.

use futures::stream::Stream;
use futures::StreamExt;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::extractor::{EmitStateDirective, StreamingStateExtractor};
use super::frame::{Frame, StateSyncFrame};
use crate::adk::agent::FrameStream;
use crate::adk::engine::{EngineEvent, EventKind, ExecutionEngine, RunConfig, END_NODE};
use crate::adk::error::Result;

pub struct EventStreamTranslator {
    engine: Arc<dyn ExecutionEngine>,
    config: RunConfig,
    agent_name: String,
    emit_state_key: String,
    /// Last top-level node seen
    node_name: Option<String>,
    /// Node reported by the last state-sync frame
    prev_node_name: Option<String>,
    /// Node whose emit-state window is open
    emit_state_until: Option<String>,
    extractor: StreamingStateExtractor,
    last_state: Value,
    last_run_id: Option<String>,
}

impl EventStreamTranslator {
    /// `state` is the state the client already holds; `node_name` seeds the
    /// tracked node when resuming a thread.
    pub fn new(
        engine: Arc<dyn ExecutionEngine>,
        config: RunConfig,
        agent_name: impl Into<String>,
        emit_state_key: impl Into<String>,
        state: Value,
        node_name: Option<String>,
    ) -> Self {
        Self {
            engine,
            config,
            agent_name: agent_name.into(),
            emit_state_key: emit_state_key.into(),
            node_name,
            prev_node_name: None,
            emit_state_until: None,
            extractor: StreamingStateExtractor::default(),
            last_state: state,
            last_run_id: None,
        }
    }

    /// Frames for one engine event, in emission order. The event itself is always last.
    pub fn translate(&mut self, event: EngineEvent) -> Result<Vec<Frame>> {
        let kind = event.kind();
        self.last_run_id = Some(event.run_id.clone());
        let directive = EmitStateDirective::from_metadata(&event.metadata, &self.emit_state_key);

        // Internal sub-node names never reach the client
        if self.engine.node_names().contains(&event.name) {
            if self.node_name.as_deref() != Some(event.name.as_str()) {
                log::debug!("Run {} entered node {}", self.config.thread_id, event.name);
            }
            self.node_name = Some(event.name.clone());
        }

        let Some(node_name) = self.node_name.clone() else {
            return Ok(vec![Frame::Event(event)]);
        };

        if let Some(directive) = &directive {
            if self.emit_state_until.is_none() {
                log::debug!("Opening emit-state window for node {}", node_name);
                self.emit_state_until = Some(node_name.clone());
            }
            if kind == EventKind::ChatModelStart {
                // A fresh generation invalidates previously buffered arguments
                self.extractor = StreamingStateExtractor::new(directive.clone());
            }
        }

        let mut state = self.engine.get_state(&self.config)?.values;

        if directive.is_some() && kind == EventKind::ChatModelStream {
            self.extractor.buffer_event(&event);
        }

        if self.emit_state_until.is_some() {
            state = overlay(state, self.extractor.extract_state());
        }

        if directive.is_none()
            && kind == EventKind::ChainEnd
            && self.emit_state_until.as_deref() == Some(event.name.as_str())
        {
            log::debug!("Closing emit-state window for node {}", event.name);
            self.emit_state_until = None;
        }

        let exiting_node = node_name == event.name && kind == EventKind::ChainEnd;

        let mut frames = Vec::with_capacity(2);
        if state != self.last_state
            || self.prev_node_name.as_deref() != Some(node_name.as_str())
            || exiting_node
        {
            self.last_state = state.clone();
            self.prev_node_name = Some(node_name.clone());
            frames.push(Frame::StateSync(
                StateSyncFrame::new(
                    self.config.thread_id.clone(),
                    Some(event.run_id.clone()),
                    self.agent_name.clone(),
                    node_name,
                    state,
                )
                .active(!exiting_node),
            ));
        }
        frames.push(Frame::Event(event));

        Ok(frames)
    }

    /// Closing state-sync frame, built from the engine's final snapshot
    pub fn finish(&mut self) -> Result<Frame> {
        let snapshot = self.engine.get_state(&self.config)?;

        let node_name = if snapshot.is_terminal() {
            END_NODE.to_string()
        } else if let Some(writer) = snapshot.last_writer() {
            writer.to_string()
        } else {
            log::warn!(
                "Run {} stopped with pending steps but no write-set recorded",
                self.config.thread_id
            );
            self.node_name.clone().unwrap_or_else(|| END_NODE.to_string())
        };

        log::info!(
            "Run {} stopped at node {} (pending: {:?})",
            self.config.thread_id,
            node_name,
            snapshot.next
        );

        // Running stays true: completion is not signalled to the client yet
        Ok(Frame::StateSync(
            StateSyncFrame::new(
                self.config.thread_id.clone(),
                self.last_run_id.clone(),
                self.agent_name.clone(),
                node_name,
                snapshot.values,
            )
            .active(false)
            .running(true),
        ))
    }

    /// Drive the engine run and yield serialized frames.
    ///
    /// `input` starts the thread from the given state; `None` resumes it.
    pub fn frames(mut self, input: Option<Value>) -> impl Stream<Item = Result<String>> + Send {
        async_stream::try_stream! {
            let mut events = self.engine.stream_events(input, &self.config).await?;

            while let Some(event) = events.next().await {
                let event = event.map_err(|e| {
                    log::error!("Engine stream for thread {} failed: {}", self.config.thread_id, e);
                    e
                })?;
                for frame in self.translate(event)? {
                    yield frame.to_line()?;
                }
            }

            yield self.finish()?.to_line()?;
        }
    }

    pub fn into_stream(self, input: Option<Value>) -> FrameStream {
        Box::pin(self.frames(input))
    }
}

/// Overlay extracted values onto a snapshot; extracted keys win
fn overlay(state: Value, extracted: Map<String, Value>) -> Value {
    if extracted.is_empty() {
        return state;
    }
    match state {
        Value::Object(mut values) => {
            values.extend(extracted);
            Value::Object(values)
        }
        _ => Value::Object(extracted),
    }
}
