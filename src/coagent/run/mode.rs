// SPDX-License-Identifier: MIT

use crate::adk::engine::END_NODE;

/// How a run relates to the thread's existing checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Begin the graph from its entry point with the merged state as input
    Start,
    /// Write the merged state into the checkpoint, then resume the thread
    Continue,
}

impl RunMode {
    /// Resume only when a thread is named and it has not already reached the end
    pub fn select(thread_id: Option<&str>, node_name: Option<&str>) -> Self {
        let has_thread = thread_id.is_some_and(|id| !id.is_empty());
        if has_thread && node_name != Some(END_NODE) {
            Self::Continue
        } else {
            Self::Start
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Continue => "continue",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_thread_starts() {
        assert_eq!(RunMode::select(None, None), RunMode::Start);
        assert_eq!(RunMode::select(None, Some("outline")), RunMode::Start);
    }

    #[test]
    fn test_empty_thread_id_is_absent() {
        assert_eq!(RunMode::select(Some(""), Some("outline")), RunMode::Start);
    }

    #[test]
    fn test_finished_thread_starts_over() {
        assert_eq!(RunMode::select(Some("t1"), Some(END_NODE)), RunMode::Start);
    }

    #[test]
    fn test_known_thread_continues() {
        assert_eq!(RunMode::select(Some("t1"), Some("outline")), RunMode::Continue);
        assert_eq!(RunMode::select(Some("t1"), None), RunMode::Continue);
        assert_eq!(RunMode::Continue.as_str(), "continue");
    }
}
