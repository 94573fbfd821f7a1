//! Handoff: hand work between threads and processes.
//!
//! Three small pieces that hosts with a single privileged thread (a UI or
//! game loop) tend to need together:
//!
//! - [`dispatch`]: a queue any thread can fill and only the owner thread
//!   drains, so background results are applied where they are allowed to be.
//! - [`locks`]: named mutexes with bounded waits, scoped to the process
//!   (`Local`) or to every process on the machine (`Global`), with names
//!   derivable from file paths.
//! - [`launcher`]: fire-and-forget worker threads and ways to get their
//!   results back.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod launcher;
pub mod locks;
pub mod logging;

pub use dispatch::Dispatcher;
pub use error::{HandoffError, Result};
pub use launcher::{Launcher, WorkerHandle, run_async};
pub use locks::{LockCoordinator, LockOutcome, MutexName, NamedLockGuard, Scope};
