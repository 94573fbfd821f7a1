//! Timeout-bounded acquisition of named mutexes.

use super::file_lock;
use super::guard::NamedLockGuard;
use super::metadata::LockMetadata;
use super::name::{MutexName, Scope};
use super::table::{Claim, LockTable};
use crate::config::Config;
use crate::error::{HandoffError, Result};
use crate::fs::atomic_write_file;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of [`LockCoordinator::with_lock`].
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome<T> {
    /// The lock was obtained, the work ran, and the lock was released.
    Completed(T),
    /// The lock stayed busy for the whole timeout; the work never ran.
    TimedOut,
}

impl<T> LockOutcome<T> {
    pub fn is_acquired(&self) -> bool {
        matches!(self, LockOutcome::Completed(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            LockOutcome::Completed(value) => Some(value),
            LockOutcome::TimedOut => None,
        }
    }
}

/// Acquires named mutexes with a bounded polling wait.
///
/// Waiting happens in slices of `poll_interval`: each slice makes one
/// acquisition attempt and then sleeps until the slice ends or an
/// in-process holder releases, whichever comes first. A timeout of `T`
/// therefore gives up no earlier than `T` and no later than `T` plus one
/// attempt.
///
/// Mutexes are not reentrant: acquiring a name the calling thread already
/// holds fails with [`HandoffError::Reentrant`] instead of waiting.
#[derive(Debug, Clone)]
pub struct LockCoordinator {
    lock_dir: PathBuf,
    poll_interval: Duration,
}

impl LockCoordinator {
    /// Create a coordinator using `lock_dir` for global lock files.
    pub fn new<P: Into<PathBuf>>(lock_dir: P, poll_interval: Duration) -> Self {
        Self {
            lock_dir: lock_dir.into(),
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.lock_dir.clone(), config.poll_interval())
    }

    pub fn lock_dir(&self) -> &Path {
        &self.lock_dir
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Path of the lock file backing `name`, or `None` for local names.
    pub fn lock_path(&self, name: &MutexName) -> Option<PathBuf> {
        match name.scope() {
            Scope::Global => Some(self.lock_dir.join(name.lock_file_name())),
            Scope::Local => None,
        }
    }

    /// Wait up to `timeout` for the named mutex.
    ///
    /// Returns `Ok(None)` when the mutex stayed busy for the whole timeout.
    /// An abandoned mutex is acquired normally (see
    /// [`NamedLockGuard::was_abandoned`]). Any other failure is returned as
    /// an error.
    pub fn acquire(&self, name: &MutexName, timeout: Duration) -> Result<Option<NamedLockGuard>> {
        let key = self.table_key(name);
        let start = Instant::now();

        loop {
            if let Some(guard) = self.attempt(name, &key)? {
                tracing::debug!(
                    mutex = %name,
                    waited_ms = start.elapsed().as_millis() as u64,
                    abandoned = guard.was_abandoned(),
                    "acquired lock"
                );
                return Ok(Some(guard));
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                tracing::debug!(
                    mutex = %name,
                    waited_ms = elapsed.as_millis() as u64,
                    "timed out waiting for lock"
                );
                return Ok(None);
            }

            let slice = self.poll_interval.min(timeout - elapsed);
            LockTable::process().wait(slice);
        }
    }

    /// Make a single attempt without waiting.
    pub fn try_acquire(&self, name: &MutexName) -> Result<Option<NamedLockGuard>> {
        self.acquire(name, Duration::ZERO)
    }

    /// Run `work` while holding the named mutex.
    ///
    /// The mutex is released however `work` exits; a panic inside `work`
    /// unwinds through the guard and then continues to the caller. If the
    /// mutex is not obtained within `timeout`, `work` is not called.
    pub fn with_lock<T, F>(&self, name: &MutexName, timeout: Duration, work: F) -> Result<LockOutcome<T>>
    where
        F: FnOnce() -> T,
    {
        let Some(guard) = self.acquire(name, timeout)? else {
            return Ok(LockOutcome::TimedOut);
        };

        let value = work();
        drop(guard);
        Ok(LockOutcome::Completed(value))
    }

    fn table_key(&self, name: &MutexName) -> String {
        match self.lock_path(name) {
            Some(path) => format!("{}{}", name.scope().prefix(), path.display()),
            None => name.to_string(),
        }
    }

    fn attempt(&self, name: &MutexName, key: &str) -> Result<Option<NamedLockGuard>> {
        let table = LockTable::process();
        let abandoned_in_process = match table.try_claim(key) {
            Claim::Reentrant => return Err(HandoffError::Reentrant(name.to_string())),
            Claim::Busy => return Ok(None),
            Claim::Claimed { abandoned } => abandoned,
        };

        let Some(lock_path) = self.lock_path(name) else {
            if abandoned_in_process {
                tracing::warn!(mutex = %name, "taking over lock abandoned by an exited thread");
            }
            return Ok(Some(NamedLockGuard::local(
                name.clone(),
                key.to_string(),
                abandoned_in_process,
            )));
        };

        // A thread that exited while holding a global lock left its
        // descriptor, and with it the flock, in the table.
        let inherited = if abandoned_in_process {
            table.file(key)
        } else {
            None
        };

        let file = match inherited {
            Some(file) => file,
            None => match file_lock::try_lock_file(&lock_path) {
                Ok(Some(file)) => {
                    let file = Arc::new(file);
                    table.attach_file(key, Arc::clone(&file));
                    file
                }
                Ok(None) => {
                    table.unclaim(key);
                    return Ok(None);
                }
                Err(e) => {
                    table.unclaim(key);
                    return Err(e);
                }
            },
        };

        let meta_path = file_lock::meta_path(&lock_path);
        let abandoned = abandoned_in_process || meta_path.exists();
        if abandoned {
            let previous = LockMetadata::from_file(&meta_path).ok();
            tracing::warn!(
                mutex = %name,
                previous_owner = previous.as_ref().map(|m| m.owner.as_str()).unwrap_or("unknown"),
                previous_pid = previous.as_ref().and_then(|m| m.pid),
                "taking over abandoned lock"
            );
        }

        // Without a sidecar a later takeover is not reported as abandoned,
        // but the flock itself is still held.
        let metadata = LockMetadata::new(&name.to_string());
        if let Err(e) = metadata
            .to_json()
            .and_then(|json| atomic_write_file(&meta_path, &json))
        {
            tracing::warn!(mutex = %name, error = %e, "failed to write lock metadata");
        }

        Ok(Some(NamedLockGuard::global(
            name.clone(),
            key.to_string(),
            file,
            lock_path,
            abandoned,
        )))
    }
}
