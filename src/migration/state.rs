//! Per-object load state machine
//!
//! ```text
//! RawLoaded -> Resolving(0) -> ... -> Resolving(n-1) -> Resolved
//!                   \________________________/
//!                               |
//!                             Failed
//! ```
//!
//! `Resolved` and `Failed` are terminal.

use std::fmt;

/// Where one object load currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Stored fields read, nothing resolved yet
    RawLoaded,
    /// Resolving the expected field at this index
    Resolving(usize),
    /// Every expected field has a value
    Resolved,
    /// The load was rejected; no partial object exists
    Failed,
}

impl LoadState {
    /// Advances to the next field. Terminal states stay where they are.
    pub fn next_field(self) -> Self {
        match self {
            LoadState::RawLoaded => LoadState::Resolving(0),
            LoadState::Resolving(i) => LoadState::Resolving(i + 1),
            terminal => terminal,
        }
    }

    /// Marks the load complete. Only a non-failed load can complete.
    pub fn complete(self) -> Self {
        match self {
            LoadState::Failed => LoadState::Failed,
            _ => LoadState::Resolved,
        }
    }

    pub fn fail(self) -> Self {
        match self {
            LoadState::Resolved => LoadState::Resolved,
            _ => LoadState::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LoadState::Resolved | LoadState::Failed)
    }

    /// Index of the field being resolved, if any
    pub fn field_index(&self) -> Option<usize> {
        match self {
            LoadState::Resolving(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadState::RawLoaded => write!(f, "RAW_LOADED"),
            LoadState::Resolving(i) => write!(f, "RESOLVING({})", i),
            LoadState::Resolved => write!(f, "RESOLVED"),
            LoadState::Failed => write!(f, "FAILED"),
        }
    }
}
