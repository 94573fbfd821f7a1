//! Filesystem utilities for handoff.
//!
//! Lock metadata sidecars are rewritten while other processes may be reading
//! them, so every write goes through a temp file and a rename.

pub mod atomic;

pub use atomic::atomic_write;
pub use atomic::atomic_write_file;
