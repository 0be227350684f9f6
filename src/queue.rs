// src/queue.rs

//! Pending operations awaiting dispatch.

// dependencies
use std::collections::VecDeque;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::warn;

use crate::errors::LimiterError;

/// A type-erased operation together with the channel that settles its caller.
trait Job: Send {
    /// Invoke the operation and route its output to the caller.
    /// The operation's future is spawned, never awaited here.
    fn run(self: Box<Self>);

    /// Settle the caller without invoking the operation.
    fn reject(self: Box<Self>, error: LimiterError);
}

struct Operation<F, T> {
    operation: F,
    settle: oneshot::Sender<Result<T, LimiterError>>,
}

impl<F, Fut, T> Job for Operation<F, T>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    fn run(self: Box<Self>) {
        let Operation { operation, settle } = *self;
        let pending = match panic::catch_unwind(AssertUnwindSafe(operation)) {
            Ok(pending) => pending,
            Err(_) => {
                warn!("Operation::run: operation panicked before returning a future");
                let _ = settle.send(Err(LimiterError::OperationPanicked));
                return;
            }
        };
        // a panic inside the spawned future drops `settle`, closing the ticket
        tokio::spawn(async move {
            let output = pending.await;
            // the caller may have dropped its ticket
            let _ = settle.send(Ok(output));
        });
    }

    fn reject(self: Box<Self>, error: LimiterError) {
        let _ = self.settle.send(Err(error));
    }
}

/// One enqueued operation, consumed exactly once.
pub(crate) struct QueuedTask {
    sequence: u64,
    job: Box<dyn Job>,
}

impl QueuedTask {
    pub(crate) fn new<F, Fut, T>(sequence: u64, operation: F) -> (Self, Ticket<T>)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (settle, receiver) = oneshot::channel();
        let task = Self {
            sequence,
            job: Box::new(Operation { operation, settle }),
        };
        (task, Ticket { receiver })
    }

    pub(crate) fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn dispatch(self) {
        self.job.run();
    }

    pub(crate) fn reject(self, error: LimiterError) {
        self.job.reject(error);
    }
}

/// FIFO of pending tasks.
#[derive(Default)]
pub(crate) struct TaskQueue {
    tasks: VecDeque<QueuedTask>,
}

impl TaskQueue {
    pub(crate) fn push(&mut self, task: QueuedTask) {
        self.tasks.push_back(task);
    }

    pub(crate) fn pop(&mut self) -> Option<QueuedTask> {
        self.tasks.pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Remove every pending task, oldest first.
    pub(crate) fn take_all(&mut self) -> Vec<QueuedTask> {
        self.tasks.drain(..).collect()
    }
}

/// Future returned by [`RateLimiter::enqueue`](crate::RateLimiter::enqueue).
///
/// Resolves to the operation's output once it has been dispatched and has
/// completed, or to an error if the task was abandoned.
#[must_use = "a ticket does nothing unless awaited, but the task is dispatched regardless"]
#[derive(Debug)]
pub struct Ticket<T> {
    receiver: oneshot::Receiver<Result<T, LimiterError>>,
}

impl<T> Future for Ticket<T> {
    type Output = Result<T, LimiterError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|settled| settled.unwrap_or(Err(LimiterError::Closed)))
    }
}
