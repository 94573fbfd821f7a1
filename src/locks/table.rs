//! Process-wide table of held lock keys.
//!
//! Every lock held by this process, local or global, has an entry here keyed
//! by its identity. For `Local` names the table *is* the mutex; for `Global`
//! names it is the first tier in front of the file lock and the place where
//! reentrant acquisition is detected.
//!
//! Holders are tracked with a weak reference to a thread-local liveness
//! token. When a thread exits, its token is dropped and any entry it still
//! owns is treated as abandoned.
//!
//! A global entry also keeps the descriptor that holds the file lock. The
//! lock belongs to that open file, not to the thread, so a thread taking
//! over an abandoned entry inherits the descriptor instead of contending
//! with it.

use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::fs::File;
use std::sync::{Arc, LazyLock, Weak};
use std::thread::{self, ThreadId};
use std::time::Duration;

thread_local! {
    static LIVENESS: Arc<()> = Arc::new(());
}

static PROCESS_TABLE: LazyLock<LockTable> = LazyLock::new(LockTable::new);

#[derive(Debug)]
struct Holder {
    thread: ThreadId,
    alive: Weak<()>,
    file: Option<Arc<File>>,
}

/// Result of a single, non-blocking claim attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Claim {
    /// The key now belongs to the calling thread.
    Claimed { abandoned: bool },
    /// Another live thread holds the key.
    Busy,
    /// The calling thread already holds the key.
    Reentrant,
}

#[derive(Debug, Default)]
pub(crate) struct LockTable {
    held: Mutex<HashMap<String, Holder>>,
    released: Condvar,
}

impl LockTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The table shared by every coordinator in this process.
    pub(crate) fn process() -> &'static LockTable {
        &PROCESS_TABLE
    }

    pub(crate) fn try_claim(&self, key: &str) -> Claim {
        let me = thread::current().id();
        // During thread teardown the token may already be gone; an empty
        // Weak then marks the entry as immediately reclaimable.
        let alive = LIVENESS.try_with(Arc::downgrade).unwrap_or_default();

        let mut held = self.held.lock();
        let abandoned = match held.get(key) {
            Some(holder) if holder.thread == me => return Claim::Reentrant,
            Some(holder) if holder.alive.strong_count() > 0 => return Claim::Busy,
            Some(_) => true,
            None => false,
        };

        let file = if abandoned {
            held.remove(key).and_then(|holder| holder.file)
        } else {
            None
        };

        held.insert(
            key.to_string(),
            Holder {
                thread: me,
                alive,
                file,
            },
        );
        Claim::Claimed { abandoned }
    }

    /// The lock descriptor recorded for `key`, if any.
    pub(crate) fn file(&self, key: &str) -> Option<Arc<File>> {
        self.held.lock().get(key).and_then(|holder| holder.file.clone())
    }

    /// Record the descriptor holding the file lock behind `key`.
    pub(crate) fn attach_file(&self, key: &str, file: Arc<File>) {
        if let Some(holder) = self.held.lock().get_mut(key) {
            holder.file = Some(file);
        }
    }

    /// Drop the entry for `key` and wake waiters.
    pub(crate) fn release(&self, key: &str) {
        self.held.lock().remove(key);
        self.released.notify_all();
    }

    /// Undo a claim that never became a lock, without waking waiters.
    pub(crate) fn unclaim(&self, key: &str) {
        self.held.lock().remove(key);
    }

    /// Block for at most `slice`, returning early when any key is released.
    pub(crate) fn wait(&self, slice: Duration) {
        let mut held = self.held.lock();
        let _ = self.released.wait_for(&mut held, slice);
    }

    #[cfg(test)]
    pub(crate) fn is_held(&self, key: &str) -> bool {
        self.held.lock().contains_key(key)
    }
}
