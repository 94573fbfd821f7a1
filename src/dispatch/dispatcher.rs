//! The owner-thread dispatcher.

use super::fault::{FaultSink, TaskFault, TracingSink, panic_message};
use super::spin::SpinLock;
use crate::error::{HandoffError, Result};
use std::collections::VecDeque;
use std::fmt;
use std::ops::AddAssign;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, LazyLock, OnceLock};
use std::thread::{self, ThreadId};
use std::time::Duration;

/// A deferred unit of work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

static GLOBAL: LazyLock<Dispatcher> = LazyLock::new(Dispatcher::new);

struct Entry {
    sequence: u64,
    task: Task,
}

#[derive(Default)]
struct Queue {
    entries: VecDeque<Entry>,
    next_sequence: u64,
}

/// Counts from one or more drains.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Tasks taken off the queue and run, including those that panicked.
    pub executed: usize,
    /// Tasks that panicked.
    pub faulted: usize,
}

impl AddAssign for DrainReport {
    fn add_assign(&mut self, other: Self) {
        self.executed += other.executed;
        self.faulted += other.faulted;
    }
}

/// Queue of tasks that any thread may fill and one owner thread runs.
///
/// Tasks run in enqueue order, each at most once, and only on the owner:
/// the first thread that drains the dispatcher. A panicking task is reported
/// to the [`FaultSink`] and draining continues with the next task. A panic
/// inside the sink itself is logged and does not escape the drain either.
///
/// Tasks run outside the queue lock, so a task may enqueue more work,
/// including onto this dispatcher.
pub struct Dispatcher {
    queue: SpinLock<Queue>,
    owner: OnceLock<ThreadId>,
    sink: Arc<dyn FaultSink>,
}

impl Dispatcher {
    /// Create a dispatcher that reports faults through `tracing`.
    pub fn new() -> Self {
        Self::with_sink(TracingSink)
    }

    /// Create a dispatcher reporting faults to `sink`.
    pub fn with_sink<S: FaultSink + 'static>(sink: S) -> Self {
        Self {
            queue: SpinLock::new(Queue::default()),
            owner: OnceLock::new(),
            sink: Arc::new(sink),
        }
    }

    /// The process-wide dispatcher, created on first use.
    ///
    /// It lives until the process exits and is owned by whichever thread
    /// drains it first, normally the host's main loop. Libraries that need
    /// isolation should construct their own instance instead.
    pub fn global() -> &'static Dispatcher {
        &GLOBAL
    }

    /// Schedule `task` to run on the owner thread.
    ///
    /// Safe from any thread, including the owner and from inside a running
    /// task. Never blocks beyond the brief queue lock.
    pub fn enqueue<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.push(Box::new(task));
    }

    /// Schedule an already boxed task; `None` is ignored.
    pub fn enqueue_boxed(&self, task: Option<Task>) {
        if let Some(task) = task {
            self.push(task);
        }
    }

    /// Number of tasks waiting to be drained.
    pub fn pending(&self) -> usize {
        self.queue.lock().entries.len()
    }

    /// The owner thread, once one has drained.
    pub fn owner(&self) -> Option<ThreadId> {
        self.owner.get().copied()
    }

    /// Run queued tasks until the queue is observed empty.
    ///
    /// Tasks enqueued while draining may run in this pass or the next.
    /// Fails with [`HandoffError::NotOwner`], running nothing, when called
    /// from a thread other than the owner.
    pub fn drain(&self) -> Result<DrainReport> {
        self.drain_at_most(usize::MAX)
    }

    /// Like [`drain`](Self::drain), but runs at most `limit` tasks.
    pub fn drain_at_most(&self, limit: usize) -> Result<DrainReport> {
        self.check_owner()?;

        let mut report = DrainReport::default();
        while report.executed < limit {
            let Some(entry) = self.pop() else {
                break;
            };

            report.executed += 1;
            if !self.run(entry) {
                report.faulted += 1;
            }
        }

        if report.executed > 0 {
            tracing::trace!(
                executed = report.executed,
                faulted = report.faulted,
                "drained dispatcher"
            );
        }
        Ok(report)
    }

    /// Drive the dispatcher from the calling thread.
    ///
    /// Drains once per `interval` for as long as `keep_running` returns
    /// true, then drains one last time so that work enqueued before the stop
    /// is not left behind.
    pub fn run_owner_loop<F>(&self, interval: Duration, mut keep_running: F) -> Result<DrainReport>
    where
        F: FnMut() -> bool,
    {
        let mut total = DrainReport::default();

        while keep_running() {
            total += self.drain()?;
            thread::sleep(interval);
        }

        total += self.drain()?;
        Ok(total)
    }

    fn push(&self, task: Task) {
        let mut queue = self.queue.lock();
        let sequence = queue.next_sequence;
        queue.next_sequence += 1;
        queue.entries.push_back(Entry { sequence, task });
    }

    fn pop(&self) -> Option<Entry> {
        self.queue.lock().entries.pop_front()
    }

    fn check_owner(&self) -> Result<()> {
        let me = thread::current().id();
        let owner = *self.owner.get_or_init(|| me);
        if owner == me {
            Ok(())
        } else {
            Err(HandoffError::NotOwner(format!(
                "dispatcher is owned by {:?}, called from {:?}",
                owner, me
            )))
        }
    }

    /// Run one task, returning false if it panicked.
    fn run(&self, entry: Entry) -> bool {
        let Entry { sequence, task } = entry;

        match panic::catch_unwind(AssertUnwindSafe(task)) {
            Ok(()) => true,
            Err(payload) => {
                let fault = TaskFault {
                    sequence,
                    message: panic_message(payload.as_ref()),
                };
                let reported = panic::catch_unwind(AssertUnwindSafe(|| self.sink.report(&fault)));
                if let Err(payload) = reported {
                    tracing::error!(
                        task = fault.sequence,
                        task_message = %fault.message,
                        sink_message = %panic_message(payload.as_ref()),
                        "fault sink panicked while reporting"
                    );
                }
                false
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pending", &self.pending())
            .field("owner", &self.owner())
            .finish()
    }
}
