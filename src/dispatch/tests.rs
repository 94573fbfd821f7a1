//! Tests for the dispatcher.

use super::*;
use crate::error::HandoffError;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

fn recording_sink() -> (Arc<Mutex<Vec<TaskFault>>>, impl FaultSink + 'static) {
    let faults = Arc::new(Mutex::new(Vec::new()));
    let sink_faults = Arc::clone(&faults);
    let sink = move |fault: &TaskFault| sink_faults.lock().push(fault.clone());
    (faults, sink)
}

#[test]
fn test_hundred_tasks_drain_in_order() {
    let dispatcher = Dispatcher::new();
    let list = Arc::new(Mutex::new(Vec::new()));

    for i in 0..100 {
        let list = Arc::clone(&list);
        dispatcher.enqueue(move || list.lock().push(i));
    }
    assert_eq!(dispatcher.pending(), 100);

    let report = dispatcher.drain().unwrap();

    assert_eq!(report, DrainReport { executed: 100, faulted: 0 });
    assert_eq!(*list.lock(), (0..100).collect::<Vec<_>>());
    assert_eq!(dispatcher.pending(), 0);
}

#[test]
fn test_concurrent_producers_lose_and_duplicate_nothing() {
    const PRODUCERS: usize = 8;
    const PER_PRODUCER: usize = 500;

    let dispatcher = Arc::new(Dispatcher::new());
    let seen = Arc::new(Mutex::new(Vec::new()));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let dispatcher = Arc::clone(&dispatcher);
            let seen = Arc::clone(&seen);
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    let seen = Arc::clone(&seen);
                    dispatcher.enqueue(move || seen.lock().push((p, i)));
                }
            })
        })
        .collect();

    // Drain on this thread while producers are still running.
    let mut total = DrainReport::default();
    while producers.iter().any(|h| !h.is_finished()) {
        total += dispatcher.drain().unwrap();
        thread::yield_now();
    }
    for handle in producers {
        handle.join().unwrap();
    }
    total += dispatcher.drain().unwrap();

    assert_eq!(total.executed, PRODUCERS * PER_PRODUCER);

    let seen = seen.lock();
    assert_eq!(seen.len(), PRODUCERS * PER_PRODUCER);
    for p in 0..PRODUCERS {
        let order: Vec<usize> = seen.iter().filter(|(q, _)| *q == p).map(|(_, i)| *i).collect();
        assert_eq!(order, (0..PER_PRODUCER).collect::<Vec<_>>(), "producer {p}");
    }
}

#[test]
fn test_panicking_task_does_not_stop_the_rest() {
    let (faults, sink) = recording_sink();
    let dispatcher = Dispatcher::with_sink(sink);
    let ran = Arc::new(AtomicUsize::new(0));

    for i in 0..5 {
        let ran = Arc::clone(&ran);
        dispatcher.enqueue(move || {
            if i == 2 {
                panic!("task {} exploded", i);
            }
            ran.fetch_add(1, Ordering::SeqCst);
        });
    }

    let report = dispatcher.drain().unwrap();
    assert_eq!(report, DrainReport { executed: 5, faulted: 1 });
    assert_eq!(ran.load(Ordering::SeqCst), 4);

    let faults = faults.lock();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].sequence, 2);
    assert_eq!(faults[0].message, "task 2 exploded");
}

fn panicking_sink(_fault: &TaskFault) {
    panic!("sink boom");
}

#[test]
fn test_panicking_sink_does_not_escape_drain() {
    let dispatcher = Dispatcher::with_sink(panicking_sink);
    let ran = Arc::new(AtomicUsize::new(0));

    dispatcher.enqueue(|| panic!("task boom"));
    let counter = Arc::clone(&ran);
    dispatcher.enqueue(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let report = dispatcher.drain().unwrap();
    assert_eq!(report.executed, 2);
    assert_eq!(report.faulted, 1);
    assert_eq!(ran.load(Ordering::SeqCst), 1);
    assert_eq!(dispatcher.pending(), 0);
}

#[test]
fn test_queue_is_usable_after_fault() {
    let (_faults, sink) = recording_sink();
    let dispatcher = Dispatcher::with_sink(sink);
    dispatcher.enqueue(|| panic!("first"));
    dispatcher.drain().unwrap();

    let ran = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ran);
    dispatcher.enqueue(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(dispatcher.drain().unwrap().executed, 1);
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn test_task_may_enqueue_more_work() {
    let dispatcher = Arc::new(Dispatcher::new());
    let list = Arc::new(Mutex::new(Vec::new()));

    {
        let inner_dispatcher = Arc::clone(&dispatcher);
        let list = Arc::clone(&list);
        dispatcher.enqueue(move || {
            list.lock().push("outer");
            let list = Arc::clone(&list);
            inner_dispatcher.enqueue(move || list.lock().push("inner"));
        });
    }

    let mut total = dispatcher.drain().unwrap();
    total += dispatcher.drain().unwrap();

    assert_eq!(total.executed, 2);
    assert_eq!(*list.lock(), vec!["outer", "inner"]);
}

#[test]
fn test_drain_at_most_leaves_the_rest() {
    let dispatcher = Dispatcher::new();
    let list = Arc::new(Mutex::new(Vec::new()));
    for i in 0..10 {
        let list = Arc::clone(&list);
        dispatcher.enqueue(move || list.lock().push(i));
    }

    assert_eq!(dispatcher.drain_at_most(3).unwrap().executed, 3);
    assert_eq!(*list.lock(), vec![0, 1, 2]);
    assert_eq!(dispatcher.pending(), 7);

    assert_eq!(dispatcher.drain_at_most(0).unwrap().executed, 0);
    assert_eq!(dispatcher.drain().unwrap().executed, 7);
    assert_eq!(list.lock().len(), 10);
}

#[test]
fn test_drain_from_other_thread_is_rejected() {
    let dispatcher = Arc::new(Dispatcher::new());
    dispatcher.drain().unwrap();
    assert_eq!(dispatcher.owner(), Some(thread::current().id()));

    let ran = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ran);
    dispatcher.enqueue(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let other = Arc::clone(&dispatcher);
    let result = thread::spawn(move || other.drain()).join().unwrap();
    assert!(matches!(result, Err(HandoffError::NotOwner(_))));
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert_eq!(dispatcher.pending(), 1);

    dispatcher.drain().unwrap();
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn test_enqueue_boxed_ignores_none() {
    let dispatcher = Dispatcher::new();
    dispatcher.enqueue_boxed(None);
    assert_eq!(dispatcher.pending(), 0);

    let task: Task = Box::new(|| {});
    dispatcher.enqueue_boxed(Some(task));
    assert_eq!(dispatcher.pending(), 1);
}

#[test]
fn test_owner_loop_drains_until_stopped() {
    let dispatcher = Arc::new(Dispatcher::new());
    let done = Arc::new(AtomicUsize::new(0));

    let producer = {
        let dispatcher = Arc::clone(&dispatcher);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for _ in 0..20 {
                let done = Arc::clone(&done);
                dispatcher.enqueue(move || {
                    done.fetch_add(1, Ordering::SeqCst);
                });
                thread::sleep(Duration::from_millis(1));
            }
        })
    };

    let report = dispatcher
        .run_owner_loop(Duration::from_millis(2), || done.load(Ordering::SeqCst) < 20)
        .unwrap();
    producer.join().unwrap();

    assert_eq!(report.executed, 20);
    assert_eq!(done.load(Ordering::SeqCst), 20);
}

#[test]
fn test_owner_loop_runs_final_drain() {
    let dispatcher = Dispatcher::new();
    dispatcher.enqueue(|| {});
    dispatcher.enqueue(|| {});

    let report = dispatcher
        .run_owner_loop(Duration::from_millis(1), || false)
        .unwrap();
    assert_eq!(report.executed, 2);
}

#[test]
fn test_global_is_a_single_instance() {
    let a = Dispatcher::global() as *const Dispatcher;
    let b = Dispatcher::global() as *const Dispatcher;
    assert_eq!(a, b);
}
