//! Reporting of tasks that panic while being drained.

use std::any::Any;

/// A deferred task that panicked on the owner thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFault {
    /// Enqueue sequence number of the task (0 for the first task ever
    /// enqueued on the dispatcher).
    pub sequence: u64,
    /// The panic message, when the payload was a string.
    pub message: String,
}

/// Receives faults from [`Dispatcher::drain`](super::Dispatcher::drain).
///
/// Reporting happens on the owner thread, between tasks.
pub trait FaultSink: Send + Sync {
    fn report(&self, fault: &TaskFault);
}

impl<F> FaultSink for F
where
    F: Fn(&TaskFault) + Send + Sync,
{
    fn report(&self, fault: &TaskFault) {
        self(fault)
    }
}

/// Default sink: one `tracing` error event per fault.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl FaultSink for TracingSink {
    fn report(&self, fault: &TaskFault) {
        tracing::error!(
            task = fault.sequence,
            message = %fault.message,
            "deferred task panicked"
        );
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_reads_str_and_string() {
        let payload: Box<dyn Any + Send> = Box::new("static text");
        assert_eq!(panic_message(payload.as_ref()), "static text");

        let payload: Box<dyn Any + Send> = Box::new(format!("formatted {}", 7));
        assert_eq!(panic_message(payload.as_ref()), "formatted 7");

        let payload: Box<dyn Any + Send> = Box::new(17_u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
