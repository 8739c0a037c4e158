//! Completion dispatch onto a single designated execution context.
//!
//! Store and sensor futures may complete on any runtime worker, but every
//! public completion callback of the facade must be delivered on one
//! designated context (the UI context, in a typical embedding). That
//! invariant is made explicit here instead of being an implicit
//! thread-affinity assumption: the facade hands every finished completion to
//! a [`Dispatcher`], and the embedder decides where dispatched tasks run.
//!
//! [`ChannelDispatcher`] is the standard choice: completions queue on an
//! unbounded channel and the embedder drains the paired [`TaskQueue`] from
//! its designated thread or task. [`InlineDispatcher`] runs completions
//! wherever the I/O finished and is intended for tests and headless tools
//! that do not care about context affinity.

use tokio::sync::mpsc;
use tracing::warn;

/// A boxed completion ready to run on the designated context.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Delivery of finished completions onto the designated context.
pub trait Dispatcher: Send + Sync + 'static {
    /// Hand over a completion. Implementations must not block.
    fn dispatch(&self, task: Task);
}

/// Runs each completion immediately on the calling task.
///
/// No context marshalling: callbacks fire on whichever worker finished the
/// underlying I/O.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, task: Task) {
        task();
    }
}

/// Queues completions for a [`TaskQueue`] drained by the embedder.
#[derive(Clone)]
pub struct ChannelDispatcher {
    tx: mpsc::UnboundedSender<Task>,
}

impl ChannelDispatcher {
    /// Create a dispatcher and the queue its completions arrive on.
    pub fn new() -> (Self, TaskQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, TaskQueue { rx })
    }
}

impl Dispatcher for ChannelDispatcher {
    fn dispatch(&self, task: Task) {
        // A closed queue means the embedder shut down its context; late
        // completions are dropped, mirroring "no cancellation, callers
        // ignore late callbacks"
        if self.tx.send(task).is_err() {
            warn!("dispatch queue closed; dropping completion");
        }
    }
}

/// Receiving end of a [`ChannelDispatcher`].
///
/// The embedder owns exactly one and drains it from the designated context.
pub struct TaskQueue {
    rx: mpsc::UnboundedReceiver<Task>,
}

impl TaskQueue {
    /// Await the next queued completion without running it.
    pub async fn recv(&mut self) -> Option<Task> {
        self.rx.recv().await
    }

    /// Run queued completions until every dispatcher handle is dropped.
    pub async fn run(mut self) {
        while let Some(task) = self.rx.recv().await {
            task();
        }
    }

    /// Run every completion that is already queued, without waiting.
    /// Returns how many ran.
    pub fn drain_ready(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_inline_dispatcher_runs_immediately() {
        let count = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&count);

        InlineDispatcher.dispatch(Box::new(move || {
            counted.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_channel_dispatcher_defers_until_drained() {
        let (dispatcher, mut queue) = ChannelDispatcher::new();
        let count = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let counted = Arc::clone(&count);
            dispatcher.dispatch(Box::new(move || {
                counted.fetch_add(1, Ordering::SeqCst);
            }));
        }

        // Nothing runs before the designated context drains the queue
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(queue.drain_ready(), 3);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_dispatch_after_queue_dropped_is_silent() {
        let (dispatcher, queue) = ChannelDispatcher::new();
        drop(queue);

        // Must not panic; the completion is dropped
        dispatcher.dispatch(Box::new(|| {}));
    }
}
