//! Implementation of the `handoff demo` command.
//!
//! Background producers enqueue work onto a dispatcher while this thread
//! acts as its owner, draining on a fixed tick. Every task checks that it
//! runs on the owner thread.

use crate::cli::DemoArgs;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::{HandoffError, Result};
use crate::launcher::Launcher;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Execute the `handoff demo` command.
pub fn cmd_demo(args: DemoArgs, config: &Config) -> Result<()> {
    if args.producers == 0 {
        return Err(HandoffError::UserError(
            "--producers must be at least 1".to_string(),
        ));
    }

    let dispatcher = Arc::new(Dispatcher::new());
    let launcher = Launcher::from_config(config);
    let owner = thread::current().id();

    let expected = args.producers * args.tasks;
    let ran = Arc::new(AtomicUsize::new(0));
    let off_owner = Arc::new(AtomicUsize::new(0));

    let mut workers = Vec::with_capacity(args.producers);
    for producer in 0..args.producers {
        let dispatcher = Arc::clone(&dispatcher);
        let ran = Arc::clone(&ran);
        let off_owner = Arc::clone(&off_owner);
        let tasks = args.tasks;

        workers.push(launcher.run_async(move || {
            for task in 0..tasks {
                let ran = Arc::clone(&ran);
                let off_owner = Arc::clone(&off_owner);
                dispatcher.enqueue(move || {
                    if thread::current().id() != owner {
                        off_owner.fetch_add(1, Ordering::SeqCst);
                    }
                    ran.fetch_add(1, Ordering::SeqCst);
                    tracing::trace!(producer, task, "task ran");
                });
            }
        })?);
    }

    // One result handed back through the dispatcher.
    let summary = Arc::new(parking_lot::Mutex::new(None));
    let slot = Arc::clone(&summary);
    launcher.spawn_reporting(
        Arc::clone(&dispatcher),
        move || Ok::<usize, HandoffError>(expected),
        move |result| *slot.lock() = Some(result),
    )?;

    let tick = Duration::from_millis(args.tick_ms.max(1));
    let limit = if args.batch == 0 { usize::MAX } else { args.batch };
    let start = Instant::now();
    let mut ticks = 0usize;
    let mut report = crate::dispatch::DrainReport::default();

    while ran.load(Ordering::SeqCst) < expected || summary.lock().is_none() {
        report += dispatcher.drain_at_most(limit)?;
        ticks += 1;
        thread::sleep(tick);
    }
    report += dispatcher.drain()?;

    for worker in workers {
        worker.join()?;
    }

    let announced = summary.lock().take().transpose()?.unwrap_or_default();
    println!(
        "Ran {} of {} tasks from {} producers on the owner thread in {} ticks ({} ms)",
        ran.load(Ordering::SeqCst),
        announced,
        args.producers,
        ticks,
        start.elapsed().as_millis()
    );
    println!("Faulted: {}", report.faulted);

    let strays = off_owner.load(Ordering::SeqCst);
    if strays > 0 {
        return Err(HandoffError::WorkFailed(format!(
            "{} task(s) ran off the owner thread",
            strays
        )));
    }
    Ok(())
}
