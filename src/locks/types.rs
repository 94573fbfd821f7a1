//! Lock state and information structures used by listing and clearing.

use super::metadata::LockMetadata;
use std::path::PathBuf;

/// Observed state of a global lock file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// Some process currently holds the lock.
    Held,
    /// Nobody holds the lock, but the last holder never released it.
    Abandoned,
    /// Nobody holds the lock and it was released cleanly.
    Idle,
}

impl LockState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockState::Held => "held",
            LockState::Abandoned => "abandoned",
            LockState::Idle => "idle",
        }
    }
}

/// Information about a global lock file.
#[derive(Debug, Clone)]
pub struct LockInfo {
    /// The lock file path.
    pub path: PathBuf,

    /// The mutex name, from metadata when available (e.g., `Global/build`).
    pub name: String,

    /// Whether the lock is held, abandoned or idle.
    pub state: LockState,

    /// Metadata written by the current or last holder.
    pub metadata: Option<LockMetadata>,

    /// Whether the recorded holder pid still exists, when known.
    pub holder_alive: Option<bool>,

    /// Whether the lock exceeds the stale threshold.
    pub is_stale: bool,
}

impl std::fmt::Display for LockInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.metadata {
            Some(meta) => write!(
                f,
                "{} ({}, owner: {}, age: {}{})",
                self.name,
                self.state.as_str(),
                meta.owner,
                meta.age_string(),
                if self.is_stale { ", STALE" } else { "" }
            ),
            None => write!(f, "{} ({})", self.name, self.state.as_str()),
        }
    }
}
