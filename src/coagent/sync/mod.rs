// SPDX-License-Identifier: MIT

//! Client state synchronization for streamed graph runs

pub mod extractor;
pub mod frame;
pub mod translator;

pub use extractor::{EmitStateDirective, EmitStateTarget, StreamingStateExtractor};
pub use frame::{Frame, StateSyncFrame, STATE_SYNC_EVENT};
pub use translator::EventStreamTranslator;
