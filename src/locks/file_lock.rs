//! Advisory file locks backing `Global` mutexes.
//!
//! A global name maps to `<lock_dir>/<stem>.lock`. The lock is an exclusive
//! `flock` on an open descriptor of that file, so the kernel drops it when
//! the holder exits for any reason. Lock files are never unlinked while a
//! lock may be taken on them; `clear_lock` only unlinks while holding the
//! flock itself, and acquirers re-check that the inode they locked is still
//! the one at the path.

use crate::error::{HandoffError, Result};
use std::fs::{self, File, OpenOptions};
use std::io;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// Sidecar path holding the metadata of the current holder.
pub(crate) fn meta_path(lock_path: &Path) -> PathBuf {
    lock_path.with_extension("lock.meta")
}

fn open_lock_file(lock_path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).truncate(false).create(true);

    #[cfg(unix)]
    {
        options.custom_flags(libc::O_NOFOLLOW);
        options.mode(0o666);
    }

    options.open(lock_path).map_err(|e| {
        HandoffError::LockError(format!(
            "failed to open lock file '{}': {}",
            lock_path.display(),
            e
        ))
    })
}

/// Try once to take the exclusive lock on `lock_path`.
///
/// Returns `Ok(None)` when another descriptor holds the lock, or when the
/// file was replaced between open and lock (the caller simply retries).
pub(crate) fn try_lock_file(lock_path: &Path) -> Result<Option<File>> {
    if let Some(parent) = lock_path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            HandoffError::LockError(format!(
                "failed to create lock directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let file = open_lock_file(lock_path)?;
    if !try_flock_exclusive(&file)? {
        return Ok(None);
    }

    if !still_linked(&file, lock_path) {
        return Ok(None);
    }

    Ok(Some(file))
}

/// Probe whether some descriptor currently holds the lock on `lock_path`.
///
/// The probe lock, if obtained, is released before returning.
pub(crate) fn is_locked(lock_path: &Path) -> Result<bool> {
    let file = open_lock_file(lock_path)?;
    Ok(!try_flock_exclusive(&file)?)
}

#[cfg(unix)]
fn try_flock_exclusive(file: &File) -> Result<bool> {
    use std::os::unix::io::AsRawFd;

    let fd = file.as_raw_fd();
    // SAFETY: `fd` comes from a live `File` borrowed for the whole call, and
    // `LOCK_EX | LOCK_NB` is a valid flock operation.
    let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        return Ok(true);
    }

    let err = io::Error::last_os_error();
    if err.kind() == io::ErrorKind::WouldBlock || err.raw_os_error() == Some(libc::EWOULDBLOCK) {
        return Ok(false);
    }
    Err(HandoffError::LockError(format!(
        "flock(LOCK_EX|LOCK_NB) failed: {}",
        err
    )))
}

#[cfg(not(unix))]
fn try_flock_exclusive(file: &File) -> Result<bool> {
    match file.try_lock() {
        Ok(()) => Ok(true),
        Err(fs::TryLockError::WouldBlock) => Ok(false),
        Err(fs::TryLockError::Error(err)) => Err(HandoffError::LockError(format!(
            "file lock failed: {}",
            err
        ))),
    }
}

/// Drop the lock held through `file`.
///
/// Explicit, because other handles to the same open file may outlive the
/// guard that is releasing.
#[cfg(unix)]
pub(crate) fn unlock_file(file: &File) -> Result<()> {
    use std::os::unix::io::AsRawFd;

    // SAFETY: the descriptor belongs to a live `File` borrowed for the call.
    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_UN) };
    if result == 0 {
        Ok(())
    } else {
        Err(HandoffError::LockError(format!(
            "flock(LOCK_UN) failed: {}",
            io::Error::last_os_error()
        )))
    }
}

#[cfg(not(unix))]
pub(crate) fn unlock_file(file: &File) -> Result<()> {
    file.unlock()
        .map_err(|e| HandoffError::LockError(format!("file unlock failed: {}", e)))
}

#[cfg(unix)]
fn still_linked(file: &File, lock_path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (file.metadata(), fs::metadata(lock_path)) {
        (Ok(open), Ok(on_disk)) => open.dev() == on_disk.dev() && open.ino() == on_disk.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn still_linked(_file: &File, lock_path: &Path) -> bool {
    lock_path.exists()
}

/// Whether a process with `pid` still exists on this host.
pub(crate) fn is_pid_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        // SAFETY: signal 0 performs only the existence and permission check.
        let result = unsafe { libc::kill(pid as libc::pid_t, 0) };
        if result == 0 {
            return true;
        }
        // EPERM means the process exists but belongs to someone else.
        io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        true
    }
}
