//! RAII guard for an acquired named mutex.

use super::file_lock;
use super::name::MutexName;
use super::table::LockTable;
use crate::error::{HandoffError, Result};
use std::fs::{self, File};
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Ownership token for an acquired named mutex.
///
/// When dropped, the lock is released. If cleanup fails, a warning is
/// logged but no panic occurs. The guard cannot be sent to another thread:
/// the mutex belongs to the thread that acquired it.
#[derive(Debug)]
pub struct NamedLockGuard {
    name: MutexName,
    key: String,
    file: Option<FileHold>,
    abandoned: bool,
    released: bool,
    _not_send: PhantomData<*const ()>,
}

#[derive(Debug)]
struct FileHold {
    file: Arc<File>,
    lock_path: PathBuf,
}

impl NamedLockGuard {
    pub(super) fn local(name: MutexName, key: String, abandoned: bool) -> Self {
        Self {
            name,
            key,
            file: None,
            abandoned,
            released: false,
            _not_send: PhantomData,
        }
    }

    pub(super) fn global(
        name: MutexName,
        key: String,
        file: Arc<File>,
        lock_path: PathBuf,
        abandoned: bool,
    ) -> Self {
        Self {
            name,
            key,
            file: Some(FileHold { file, lock_path }),
            abandoned,
            released: false,
            _not_send: PhantomData,
        }
    }

    /// The mutex this guard holds.
    pub fn name(&self) -> &MutexName {
        &self.name
    }

    /// Whether the previous holder terminated without releasing.
    ///
    /// Acquisition succeeds either way; this only lets callers with recovery
    /// logic notice that earlier protected work may have been interrupted.
    pub fn was_abandoned(&self) -> bool {
        self.abandoned
    }

    /// Backing lock file, for global mutexes.
    pub fn lock_path(&self) -> Option<&Path> {
        self.file.as_ref().map(|hold| hold.lock_path.as_path())
    }

    /// Release the lock now and report cleanup failures.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.release_inner()
    }

    fn release_inner(&mut self) -> Result<()> {
        let mut result = Ok(());

        if let Some(hold) = self.file.take() {
            let meta = file_lock::meta_path(&hold.lock_path);
            if let Err(e) = fs::remove_file(&meta)
                && e.kind() != io::ErrorKind::NotFound
            {
                result = Err(HandoffError::Io(format!(
                    "failed to remove lock metadata '{}': {}",
                    meta.display(),
                    e
                )));
            }
            // The process table shares the descriptor, so closing our handle
            // alone would not drop the flock.
            if let Err(e) = file_lock::unlock_file(&hold.file)
                && result.is_ok()
            {
                result = Err(e);
            }
            drop(hold.file);
        }

        LockTable::process().release(&self.key);
        tracing::debug!(mutex = %self.name, "released lock");
        result
    }
}

impl Drop for NamedLockGuard {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = self.release_inner()
        {
            tracing::warn!(mutex = %self.name, error = %e, "failed to clean up lock on release");
        }
    }
}
