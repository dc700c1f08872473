//! Event types emitted by the engine to the presentation layer

use crate::engine::resolver::MatchResult;

/// Outcome of a resolved search key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// No exact catalog match for this key
    NoMatch,
    /// Exact catalog match found
    Matched,
}

/// Events published by the scan engine
///
/// Delivered over a channel the presentation layer subscribes to; replaces
/// any direct coupling between engine state and UI.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A search key reached a terminal state for this session
    KeyResolved {
        /// Normalized search key
        key: String,
        /// Terminal outcome
        outcome: ResolveOutcome,
    },
    /// A decisive match froze the engine
    MatchFrozen(MatchResult),
    /// The session was restarted and all key history cleared
    Restarted,
}

/// Snapshot of dedup progress for display
#[derive(Debug, Clone, Default)]
pub struct ScanProgress {
    /// Keys with a lookup currently outstanding
    pub in_flight: Vec<String>,
    /// Keys already resolved this session
    pub resolved: Vec<String>,
}
