// SPDX-License-Identifier: MIT

//! Run controller: mode selection, state merge and the graph agent

mod controller;
mod merge;
mod mode;

pub use controller::{GraphAgent, GRAPH_AGENT_TYPE};
pub use merge::{default_merge_state, merge_state_with_key, MergeStateFn};
pub use mode::RunMode;
