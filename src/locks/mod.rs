//! Named mutexes for same-host coordination.
//!
//! A [`MutexName`] is either `Global/<payload>` (shared by every process on
//! the host that uses the same lock directory) or `Local/<payload>` (shared
//! by the threads of this process). Names can be derived from filesystem
//! paths with [`name_for_path`], so two spellings of one location contend
//! for the same lock.
//!
//! # Lock Files
//!
//! Global mutexes are exclusive advisory locks on files in the configured
//! lock directory. The kernel drops the lock when its holder exits, so a
//! crashed holder never wedges the name.
//!
//! # Lock Metadata
//!
//! While held, a global lock has a JSON sidecar (`<stem>.lock.meta`):
//! - `name`: The fully qualified mutex name
//! - `owner`: The owner of the lock (e.g., `user@HOST`)
//! - `pid`, `thread`: Who holds it
//! - `acquired_at`: RFC3339 timestamp
//!
//! The sidecar is removed on release. Finding one when acquiring means the
//! previous holder was abandoned; acquisition still succeeds.
//!
//! # RAII Guards
//!
//! Locks are managed through [`NamedLockGuard`], which releases the lock when
//! dropped. If cleanup fails during drop, a warning is logged but the
//! program does not crash.

mod coordinator;
mod file_lock;
mod guard;
mod metadata;
mod name;
mod operations;
mod table;
mod types;


// Re-export public API
pub use coordinator::{LockCoordinator, LockOutcome};
pub use guard::NamedLockGuard;
pub use metadata::LockMetadata;
pub use name::{
    GLOBAL_PREFIX, LOCAL_PREFIX, MutexName, Scope, canonical_path, digest_hex, name_for,
    name_for_path,
};
pub use operations::{clear_lock, list_locks};
pub use types::{LockInfo, LockState};
