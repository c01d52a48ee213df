// SPDX-License-Identifier: MIT

//! Recorded-run replay

mod engine;
mod script;

pub use engine::{ScriptedEngine, StateUpdate};
pub use script::{ReplayEnd, ReplayScript, ReplayStep};
