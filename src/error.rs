//! Error types for handoff.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.
//! A lock that could not be obtained within its timeout is NOT an error at the
//! library level (see [`crate::locks::LockOutcome`]); only the CLI turns it into
//! [`HandoffError::LockTimeout`].

use crate::exit_codes;
use thiserror::Error;

/// Main error type for handoff operations.
#[derive(Error, Debug)]
pub enum HandoffError {
    /// User provided invalid arguments or configuration.
    #[error("{0}")]
    UserError(String),

    /// The OS-level lock could not be obtained for a reason other than
    /// contention or abandonment.
    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    /// The lock stayed busy for the whole timeout.
    #[error("Timed out after {waited_ms}ms waiting for lock '{name}'")]
    LockTimeout { name: String, waited_ms: u64 },

    /// The calling thread already holds the named lock.
    #[error("Lock '{0}' is already held by the calling thread")]
    Reentrant(String),

    /// A drain was attempted from a thread other than the dispatcher's owner.
    #[error("Drain called off the owner thread: {0}")]
    NotOwner(String),

    /// Work executed under a lock reported failure.
    #[error("Work failed: {0}")]
    WorkFailed(String),

    /// Filesystem or thread-spawn failure.
    #[error("I/O error: {0}")]
    Io(String),
}

impl HandoffError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            HandoffError::UserError(_) => exit_codes::USER_ERROR,
            HandoffError::NotOwner(_) => exit_codes::USER_ERROR,
            HandoffError::Io(_) => exit_codes::USER_ERROR,
            HandoffError::WorkFailed(_) => exit_codes::WORK_FAILURE,
            HandoffError::LockError(_) => exit_codes::LOCK_FAILURE,
            HandoffError::LockTimeout { .. } => exit_codes::LOCK_FAILURE,
            HandoffError::Reentrant(_) => exit_codes::LOCK_FAILURE,
        }
    }
}

/// Result type alias for handoff operations.
pub type Result<T> = std::result::Result<T, HandoffError>;
