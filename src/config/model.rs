//! Config struct definition and default implementation.

use super::types::*;
use crate::locks::Scope;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for handoff.
///
/// This struct represents the contents of `handoff.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Lock settings
    // =========================================================================
    /// Length of one poll slice while waiting for a named mutex.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Timeout used when a caller does not pass one explicitly.
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    /// Directory holding the lock files that back `Global` mutexes.
    ///
    /// Every process that should contend for the same global names must
    /// point at the same directory.
    #[serde(default = "default_lock_dir")]
    pub lock_dir: PathBuf,

    /// Scope used by the CLI when neither `--global` nor `--local` is given.
    #[serde(default)]
    pub default_scope: Scope,

    /// Minutes after which a held lock is reported as stale by `lock list`.
    #[serde(default = "default_lock_stale_minutes")]
    pub lock_stale_minutes: u32,

    // =========================================================================
    // Worker settings
    // =========================================================================
    /// Prefix for background worker thread names.
    #[serde(default = "default_worker_name_prefix")]
    pub worker_name_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            default_timeout_ms: default_timeout_ms(),
            lock_dir: default_lock_dir(),
            default_scope: Scope::default(),
            lock_stale_minutes: default_lock_stale_minutes(),
            worker_name_prefix: default_worker_name_prefix(),
        }
    }
}
