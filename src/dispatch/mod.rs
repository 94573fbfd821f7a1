//! Owner-thread task dispatch.
//!
//! Any thread may [`enqueue`](Dispatcher::enqueue) closures; one designated
//! owner thread runs them when it calls [`drain`](Dispatcher::drain), usually
//! once per iteration of its own loop. This is how background work hands
//! results to state that only the owner may touch.
//!
//! ```
//! use handoff::dispatch::Dispatcher;
//! use std::sync::{Arc, Mutex};
//!
//! let dispatcher = Arc::new(Dispatcher::new());
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let producer = {
//!     let dispatcher = Arc::clone(&dispatcher);
//!     let seen = Arc::clone(&seen);
//!     std::thread::spawn(move || dispatcher.enqueue(move || seen.lock().unwrap().push(1)))
//! };
//! producer.join().unwrap();
//!
//! let report = dispatcher.drain()?;
//! assert_eq!(report.executed, 1);
//! assert_eq!(*seen.lock().unwrap(), vec![1]);
//! # Ok::<(), handoff::error::HandoffError>(())
//! ```

mod dispatcher;
mod fault;
mod spin;

#[cfg(test)]
mod tests;

pub use dispatcher::{Dispatcher, DrainReport, Task};
pub use fault::{FaultSink, TaskFault, TracingSink};
pub(crate) use fault::panic_message;
