//! Background work on detached worker threads.
//!
//! Workers never keep the process alive: when the main thread returns, the
//! process exits whether or not workers are still running. A worker's
//! return value is not collected; results travel back explicitly, either
//! through the [`Dispatcher`] ([`Launcher::spawn_reporting`]) or through a
//! [`Collector`].

use crate::config::Config;
use crate::dispatch::{Dispatcher, panic_message};
use crate::error::{HandoffError, Result};
use crossbeam::channel::{self, Receiver, TryRecvError};
use std::ops::Deref;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle, ThreadId};

static NEXT_WORKER: AtomicU64 = AtomicU64::new(1);

/// Handle to a spawned worker. Dropping it detaches the worker.
#[derive(Debug)]
pub struct WorkerHandle {
    id: u64,
    handle: JoinHandle<()>,
}

impl WorkerHandle {
    /// Process-unique worker number.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.handle.thread().name()
    }

    pub fn thread_id(&self) -> ThreadId {
        self.handle.thread().id()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the worker returns.
    pub fn join(self) -> Result<()> {
        self.handle
            .join()
            .map_err(|payload| HandoffError::WorkFailed(panic_message(payload.as_ref())))
    }
}

/// Result of polling a [`Collector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectPoll<T> {
    /// The next item, in production order.
    Item(T),
    /// Nothing available yet; the worker is still producing.
    Pending,
    /// The worker finished and every item has been taken.
    Done,
}

/// Items produced by [`Launcher::collect_async`], read from the consumer side.
#[derive(Debug)]
pub struct Collector<T> {
    items: Receiver<T>,
    worker: WorkerHandle,
}

impl<T> Collector<T> {
    /// Take the next item without blocking.
    pub fn poll_next(&self) -> CollectPoll<T> {
        match self.items.try_recv() {
            Ok(item) => CollectPoll::Item(item),
            Err(TryRecvError::Empty) => CollectPoll::Pending,
            Err(TryRecvError::Disconnected) => CollectPoll::Done,
        }
    }

    /// The next item if one is ready.
    ///
    /// `None` means either "not yet" or "never"; see [`is_done`](Self::is_done).
    pub fn try_next(&self) -> Option<T> {
        match self.poll_next() {
            CollectPoll::Item(item) => Some(item),
            CollectPoll::Pending | CollectPoll::Done => None,
        }
    }

    /// True once the worker has finished and every item has been taken.
    pub fn is_done(&self) -> bool {
        self.worker.is_finished() && self.items.is_empty()
    }

    /// Block until the worker finishes and return the remaining items.
    pub fn wait_all(self) -> Vec<T> {
        let items = self.items.iter().collect();
        // The worker catches panics itself, so join cannot fail here.
        let _ = self.worker.join();
        items
    }

    pub fn worker(&self) -> &WorkerHandle {
        &self.worker
    }
}

/// Spawns named, detached worker threads.
#[derive(Debug, Clone)]
pub struct Launcher {
    name_prefix: String,
}

impl Default for Launcher {
    fn default() -> Self {
        Self::new(crate::config::types::default_worker_name_prefix())
    }
}

impl Launcher {
    pub fn new<S: Into<String>>(name_prefix: S) -> Self {
        Self {
            name_prefix: name_prefix.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.worker_name_prefix.clone())
    }

    /// Run `work` on a new detached thread.
    ///
    /// A panic inside `work` is caught and logged; it never reaches the
    /// spawning thread.
    pub fn run_async<F>(&self, work: F) -> Result<WorkerHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        let id = NEXT_WORKER.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}-{}", self.name_prefix, id);

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(work)) {
                    tracing::error!(
                        worker = %name,
                        message = %panic_message(payload.as_ref()),
                        "background work panicked"
                    );
                }
            })
            .map_err(|e| HandoffError::Io(format!("failed to spawn worker thread: {}", e)))?;

        Ok(WorkerHandle { id, handle })
    }

    /// Run `work` in the background and hand its result to `deliver` on the
    /// dispatcher's owner thread.
    ///
    /// If `work` panics, nothing is delivered and the panic is logged.
    pub fn spawn_reporting<R, T, E, W, D>(
        &self,
        dispatcher: R,
        work: W,
        deliver: D,
    ) -> Result<WorkerHandle>
    where
        R: Deref<Target = Dispatcher> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
        W: FnOnce() -> std::result::Result<T, E> + Send + 'static,
        D: FnOnce(std::result::Result<T, E>) + Send + 'static,
    {
        self.run_async(move || {
            let result = work();
            dispatcher.enqueue(move || deliver(result));
        })
    }

    /// Drain `source` on a worker thread, exposing its items as they arrive.
    pub fn collect_async<I>(&self, source: I) -> Result<Collector<I::Item>>
    where
        I: IntoIterator + Send + 'static,
        I::Item: Send + 'static,
    {
        let (tx, rx) = channel::unbounded();
        let worker = self.run_async(move || {
            for item in source {
                if tx.send(item).is_err() {
                    // Collector dropped; nobody is listening.
                    break;
                }
            }
        })?;

        Ok(Collector { items: rx, worker })
    }
}

/// Run `work` on a detached thread named with the default prefix.
pub fn run_async<F>(work: F) -> Result<WorkerHandle>
where
    F: FnOnce() + Send + 'static,
{
    Launcher::default().run_async(work)
}

/// [`Launcher::spawn_reporting`] with the default launcher.
pub fn spawn_reporting<R, T, E, W, D>(dispatcher: R, work: W, deliver: D) -> Result<WorkerHandle>
where
    R: Deref<Target = Dispatcher> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
    W: FnOnce() -> std::result::Result<T, E> + Send + 'static,
    D: FnOnce(std::result::Result<T, E>) + Send + 'static,
{
    Launcher::default().spawn_reporting(dispatcher, work, deliver)
}

/// [`Launcher::collect_async`] with the default launcher.
pub fn collect_async<I>(source: I) -> Result<Collector<I::Item>>
where
    I: IntoIterator + Send + 'static,
    I::Item: Send + 'static,
{
    Launcher::default().collect_async(source)
}
