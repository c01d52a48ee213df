// SPDX-License-Identifier: MIT

//! Agent-facing contracts: the agent trait, the execution-engine capability,
//! conversation messages, the action catalog and the error hierarchy.

pub mod action;
pub mod agent;
pub mod engine;
pub mod error;
pub mod message;
