//! Default value functions for the Config struct.

use std::path::PathBuf;

// Default value functions for serde
pub(crate) fn default_poll_interval_ms() -> u64 {
    200
}
pub(crate) fn default_timeout_ms() -> u64 {
    1000
}
pub(crate) fn default_lock_dir() -> PathBuf {
    std::env::temp_dir().join("handoff-locks")
}
pub(crate) fn default_lock_stale_minutes() -> u32 {
    120
}
pub(crate) fn default_worker_name_prefix() -> String {
    "handoff-worker".to_string()
}
