// src/rate_limiter.rs

// bucket-limiter: a windowed-budget scheduler for outbound async operations.

// dependencies
use crate::clock::{Clock, MonotonicClock};
use crate::config::{LimiterMode, RateLimiterConfig};
use crate::errors::LimiterError;
use crate::history::HistoryEntry;
use crate::ledger::BucketLedger;
use crate::listeners::{ListenerId, ListenerRegistry};
use crate::queue::{QueuedTask, TaskQueue, Ticket};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// State serialized behind a single mutex. The worker never holds the
/// guard across an await point.
struct State {
    ledger: BucketLedger,
    queue: TaskQueue,
    /// A task has been popped and is waiting behind the delay timer.
    in_flight: bool,
    /// Bumped by `clear()`; a timer armed under an older epoch is stale.
    epoch: u64,
    next_sequence: u64,
}

struct Shared<C> {
    state: Mutex<State>,
    listeners: ListenerRegistry,
    clock: C,
    /// Signals the worker that work was enqueued.
    work: Notify,
    /// Wakes a worker sleeping on the delay timer.
    cleared: Notify,
}

/// What the worker should do next.
enum Step {
    Idle,
    Continue,
    Delay {
        task: QueuedTask,
        delay: Duration,
        epoch: u64,
    },
}

/// The main RateLimiter model.
/// C is the clock type, defaulting to MonotonicClock.
///
/// Operations passed to [`enqueue`](RateLimiter::enqueue) are dispatched in
/// FIFO order by a single worker task. While the ledger is not limiting,
/// tasks dispatch immediately; once limiting engages, each dispatch waits
/// behind one delay timer.
pub struct RateLimiter<C = MonotonicClock>
where
    C: Clock + 'static,
{
    shared: Arc<Shared<C>>,
    worker: JoinHandle<()>,
    mode: LimiterMode,
}

impl RateLimiter<MonotonicClock> {
    /// Create a limiter driven by a [`MonotonicClock`].
    /// Must be called from within a tokio runtime.
    pub fn new(config: RateLimiterConfig) -> Result<Self, LimiterError> {
        Self::with_config(config, MonotonicClock::new())
    }
}

impl<C> RateLimiter<C>
where
    C: Clock + 'static,
{
    // method to create a new rate limiter from a config object and a clock
    pub fn with_config(config: RateLimiterConfig, clock: C) -> Result<Self, LimiterError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| LimiterError::NoRuntime)?;
        let now = clock.now()?;

        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                ledger: BucketLedger::new(&config, now),
                queue: TaskQueue::default(),
                in_flight: false,
                epoch: 0,
                next_sequence: 0,
            }),
            listeners: ListenerRegistry::new(),
            clock,
            work: Notify::new(),
            cleared: Notify::new(),
        });
        let worker = runtime.spawn(run(Arc::clone(&shared)));
        debug!(?config, "RateLimiter::with_config: worker started");

        Ok(Self {
            shared,
            worker,
            mode: config.mode,
        })
    }

    /// Queue an operation for dispatch.
    ///
    /// The queue position is fixed when this is called, not when the ticket
    /// is first polled. The operation runs once dispatched even if the
    /// ticket is dropped; its output (including any error value it carries)
    /// is passed through unchanged.
    pub fn enqueue<F, Fut, T>(&self, operation: F) -> Ticket<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let mut state = self.shared.lock();
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        let (task, ticket) = QueuedTask::new(sequence, operation);
        state.queue.push(task);
        let queued = state.queue.len();
        drop(state);

        trace!(sequence, queued, "RateLimiter::enqueue: queued");
        self.shared.work.notify_one();
        ticket
    }

    /// Time until an operation could be dispatched without delay.
    pub fn wait_time(&self) -> Result<Duration, LimiterError> {
        let now = self.shared.clock.now()?;
        let state = self.shared.lock();
        Ok(Duration::from_nanos(state.ledger.wait_time(now)))
    }

    /// Tasks not yet dispatched, counting the one waiting behind the timer.
    pub fn queue_length(&self) -> usize {
        let state = self.shared.lock();
        state.queue.len() + usize::from(state.in_flight)
    }

    /// Cancel the pending timer and abandon every undispatched task.
    /// Abandoned tickets resolve to [`LimiterError::Cancelled`]. Requests
    /// already counted stay in the ledger.
    pub fn clear(&self) {
        let abandoned = {
            let mut state = self.shared.lock();
            state.epoch += 1;
            state.in_flight = false;
            state.queue.take_all()
        };
        self.shared.cleared.notify_waiters();

        debug!(abandoned = abandoned.len(), "RateLimiter::clear: queue cleared");
        for task in abandoned {
            task.reject(LimiterError::Cancelled);
        }
    }

    /// Register a callback invoked with `true` when limiting engages and
    /// `false` when it releases.
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.shared.listeners.add(listener)
    }

    /// Returns whether a listener was registered under `id`.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.shared.listeners.remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.shared.listeners.len()
    }

    /// Retained history entries, oldest first. Empty unless enabled.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.shared.lock().ledger.history()
    }

    pub fn is_limiting(&self) -> bool {
        self.shared.lock().ledger.is_limiting()
    }

    /// Budget of the current bucket
    pub fn budget(&self) -> u64 {
        self.shared.lock().ledger.budget()
    }

    /// Request counts per bucket, oldest first
    pub fn buckets(&self) -> Vec<u64> {
        self.shared.lock().ledger.buckets()
    }

    pub fn mode(&self) -> LimiterMode {
        self.mode
    }
}

impl<C> Drop for RateLimiter<C>
where
    C: Clock + 'static,
{
    fn drop(&mut self) {
        // pending tickets settle with `Closed` once the worker's state is dropped
        self.worker.abort();
    }
}

impl<C> fmt::Debug for RateLimiter<C>
where
    C: Clock + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("mode", &self.mode)
            .field("queue_length", &self.queue_length())
            .field("limiting", &self.is_limiting())
            .field("listeners", &self.shared.listeners)
            .finish()
    }
}

impl<C: Clock> Shared<C> {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn epoch_is(&self, epoch: u64) -> bool {
        self.lock().epoch == epoch
    }

    /// Pop the head of the queue and either dispatch it or arm the timer.
    fn next_step(&self) -> Step {
        let mut state = self.lock();
        let Some(task) = state.queue.pop() else {
            return Step::Idle;
        };

        let now = match self.clock.now() {
            Ok(now) => now,
            Err(error) => {
                drop(state);
                warn!(%error, sequence = task.sequence(), "RateLimiter: clock failed, rejecting task");
                task.reject(error.into());
                return Step::Continue;
            }
        };

        if state.ledger.is_limiting() {
            let delay = Duration::from_nanos(state.ledger.wait_time(now));
            state.in_flight = true;
            trace!(sequence = task.sequence(), ?delay, "RateLimiter: waiting behind timer");
            return Step::Delay {
                task,
                delay,
                epoch: state.epoch,
            };
        }

        let transition = state.ledger.tick(now);
        drop(state);
        self.dispatch(task, transition);
        Step::Continue
    }

    /// Timer fired (or was cancelled) for a task popped under `epoch`.
    fn fire(&self, task: QueuedTask, epoch: u64) {
        let mut state = self.lock();
        if state.epoch != epoch {
            drop(state);
            trace!(sequence = task.sequence(), "RateLimiter: timer cancelled");
            task.reject(LimiterError::Cancelled);
            return;
        }
        state.in_flight = false;

        match self.clock.now() {
            Ok(now) => {
                let transition = state.ledger.tick(now);
                drop(state);
                self.dispatch(task, transition);
            }
            Err(error) => {
                drop(state);
                warn!(%error, sequence = task.sequence(), "RateLimiter: clock failed, rejecting task");
                task.reject(error.into());
            }
        }
    }

    fn dispatch(&self, task: QueuedTask, transition: Option<bool>) {
        if let Some(limiting) = transition {
            self.listeners.notify(limiting);
        }
        trace!(sequence = task.sequence(), "RateLimiter: dispatching");
        task.dispatch();
    }
}

/// Worker loop draining the queue against the ledger.
async fn run<C: Clock>(shared: Arc<Shared<C>>) {
    loop {
        match shared.next_step() {
            Step::Idle => shared.work.notified().await,
            Step::Continue => {}
            Step::Delay { task, delay, epoch } => {
                let cleared = shared.cleared.notified();
                tokio::pin!(cleared);
                cleared.as_mut().enable();

                // a clear() between arming and enabling is caught by the epoch
                if shared.epoch_is(epoch) {
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = &mut cleared => {}
                    }
                }
                shared.fire(task, epoch);
            }
        }
    }
}
