// SPDX-License-Identifier: MIT

//! State synchronization between a running graph and its client

pub mod config;
pub mod partial_json;
pub mod registry;
pub mod replay;
pub mod run;
pub mod sync;

pub use config::{CoagentConfig, ConfigLoader, SyncSettings};
pub use registry::AgentRegistry;
pub use run::GraphAgent;
