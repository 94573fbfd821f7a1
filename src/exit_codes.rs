//! Exit code constants for the handoff CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid config)
//! - 2: Work under the lock failed
//! - 4: Lock acquisition failure (timeout, fault, reentrancy)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid configuration.
pub const USER_ERROR: i32 = 1;

/// The command run under the lock exited unsuccessfully.
pub const WORK_FAILURE: i32 = 2;

/// Lock acquisition failure: the named mutex could not be obtained.
pub const LOCK_FAILURE: i32 = 4;
