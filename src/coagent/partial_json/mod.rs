// SPDX-License-Identifier: MIT

//! Tolerant parsing of incomplete JSON
//!
//! Tool-call arguments arrive token by token, so most of the time the
//! buffered text is not a valid document yet. [`parse`] returns the largest
//! structurally valid value the text describes so far:
//! - `{"a": "hel` parses as `{"a": "hel"}`
//! - `{"a": 1, "b` parses as `{"a": 1}`
//! - `{"ci` has nothing usable yet and fails with [`PartialJsonError::Incomplete`]
//! - `{"a": 1, "b": [{"x` keeps the opened array as `{"a": 1, "b": [{}]}`

mod parser;

pub use parser::{parse, PartialJsonError, MAX_DEPTH};
