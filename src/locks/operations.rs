//! Listing and clearing global lock files.

use super::file_lock;
use super::metadata::LockMetadata;
use super::name::{GLOBAL_PREFIX, MutexName, Scope};
use super::types::{LockInfo, LockState};
use crate::error::{HandoffError, Result};
use std::fs;
use std::io;
use std::path::Path;

/// List global locks in `lock_dir` that are held or were abandoned.
///
/// Cleanly released lock files are skipped. Only lock files with a metadata
/// sidecar are probed, and probing briefly takes the lock, so a concurrent
/// zero-timeout acquire of such a lock in another process may miss.
pub fn list_locks(lock_dir: &Path, stale_minutes: u32) -> Result<Vec<LockInfo>> {
    let mut locks = Vec::new();

    if !lock_dir.exists() {
        return Ok(locks);
    }

    let entries = fs::read_dir(lock_dir).map_err(|e| {
        HandoffError::Io(format!(
            "failed to read lock directory '{}': {}",
            lock_dir.display(),
            e
        ))
    })?;

    for entry in entries {
        let entry = entry
            .map_err(|e| HandoffError::Io(format!("failed to read lock directory entry: {}", e)))?;
        let path = entry.path();

        if path.extension().and_then(|e| e.to_str()) != Some("lock") {
            continue;
        }

        let info = inspect(&path, stale_minutes)?;
        if info.state != LockState::Idle {
            locks.push(info);
        }
    }

    locks.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(locks)
}

/// Remove the files of a global lock that nobody holds.
///
/// Refuses with `LockError` while the lock is held. The files are unlinked
/// while this call holds the lock, so a concurrent acquirer that opened the
/// old file notices the replacement and retries.
pub fn clear_lock(lock_dir: &Path, name: &MutexName, stale_minutes: u32) -> Result<LockInfo> {
    if name.scope() != Scope::Global {
        return Err(HandoffError::UserError(format!(
            "'{}' is a local lock; it exists only inside its process",
            name
        )));
    }

    let lock_path = lock_dir.join(name.lock_file_name());
    if !lock_path.exists() {
        return Err(HandoffError::UserError(format!(
            "lock '{}' does not exist at: {}",
            name,
            lock_path.display()
        )));
    }

    let mut info = inspect(&lock_path, stale_minutes)?;
    let Some(file) = file_lock::try_lock_file(&lock_path)? else {
        let holder = info
            .metadata
            .as_ref()
            .and_then(|m| m.pid)
            .map(|pid| format!(" by pid {}", pid))
            .unwrap_or_default();
        return Err(HandoffError::LockError(format!(
            "lock '{}' is held{}",
            name, holder
        )));
    };

    let meta_path = file_lock::meta_path(&lock_path);
    for path in [&meta_path, &lock_path] {
        if let Err(e) = fs::remove_file(path)
            && e.kind() != io::ErrorKind::NotFound
        {
            return Err(HandoffError::Io(format!(
                "failed to clear lock '{}': {}",
                path.display(),
                e
            )));
        }
    }
    drop(file);

    if info.state == LockState::Held {
        // Released between the probe and our own lock.
        info.state = if info.metadata.is_some() {
            LockState::Abandoned
        } else {
            LockState::Idle
        };
    }
    Ok(info)
}

fn inspect(lock_path: &Path, stale_minutes: u32) -> Result<LockInfo> {
    let metadata = LockMetadata::from_file(file_lock::meta_path(lock_path)).ok();

    // Without a sidecar the file was released cleanly (or its holder could
    // not write one); either way it is not listed, so skip the probe.
    let state = if metadata.is_none() {
        LockState::Idle
    } else if file_lock::is_locked(lock_path)? {
        LockState::Held
    } else {
        LockState::Abandoned
    };

    let name = metadata.as_ref().map(|m| m.name.clone()).unwrap_or_else(|| {
        let stem = lock_path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        format!("{}{}", GLOBAL_PREFIX, stem)
    });

    let holder_alive = metadata
        .as_ref()
        .and_then(|m| m.pid)
        .map(file_lock::is_pid_alive);
    let is_stale = metadata
        .as_ref()
        .is_some_and(|m| m.is_stale(stale_minutes));

    Ok(LockInfo {
        path: lock_path.to_path_buf(),
        name,
        state,
        metadata,
        holder_alive,
        is_stale,
    })
}
