//! Generic retrying task queue.
//!
//! The queue owns an insertion-ordered list of tasks. Whenever something
//! changes (a task is added, an attempt settles, a retry wait elapses) a
//! scheduling pass asks the active [`Strategy`] which tasks to admit and
//! starts one attempt for each admitted task through its [`Runner`].
//!
//! All passes run on a single driver task spawned at construction, so passes
//! are never re-entrant; `add` only appends and wakes the driver. Completions
//! and events are delivered through channels, never by calling back into the
//! caller while the queue is mid-update.

mod driver;
mod event;
mod outcome;
mod runner;
mod task;
mod timer;


pub use event::{QueueAction, QueueEvent, QueueEvents};
pub use outcome::{Outcome, TaskError};
pub use runner::{BoxFuture, Runner};
pub use task::{QueueStatus, TaskId, TaskSnapshot, TaskState};
pub use timer::{Timer, TokioTimer};

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::strategy::Strategy;
use driver::{Driver, Signal};
use event::Subscribers;
use task::Task;

/// Retry bookkeeping for a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueOptions {
    /// Fixed delay between a transient failure and the task becoming eligible again.
    pub wait_time: Duration,
    /// Maximum number of attempts per task (including the first). At least 1.
    pub max_attempts: u32,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            wait_time: Duration::from_millis(1000),
            max_attempts: 50,
        }
    }
}

/// State shared between queue handles and the driver.
pub(crate) struct Shared<P, T, E> {
    tasks: Mutex<Vec<Task<P, T, E>>>,
    next_id: AtomicU64,
    subscribers: Subscribers,
}

impl<P, T, E> Shared<P, T, E> {
    fn new() -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            subscribers: Subscribers::default(),
        }
    }

    pub(crate) fn tasks(&self) -> MutexGuard<'_, Vec<Task<P, T, E>>> {
        self.tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Remove a task by id and emit the matching event.
    ///
    /// Events are emitted with the task list still locked so subscribers see
    /// lengths in the order the list changed.
    pub(crate) fn remove(&self, id: TaskId, action: QueueAction) -> Option<Task<P, T, E>> {
        let mut tasks = self.tasks();
        let index = tasks.iter().position(|t| t.id == id)?;
        let task = tasks.remove(index);
        self.subscribers.emit(QueueEvent {
            action,
            id,
            length: tasks.len(),
        });
        Some(task)
    }
}

/// Handle to a retrying task queue. Clones share the same queue.
pub struct TaskQueue<P, T, E> {
    shared: Arc<Shared<P, T, E>>,
    signals: mpsc::UnboundedSender<Signal<T, E>>,
}

impl<P, T, E> Clone for TaskQueue<P, T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            signals: self.signals.clone(),
        }
    }
}

impl<P, T, E> TaskQueue<P, T, E>
where
    P: Clone + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    /// Create a queue using tokio's timer for retry waits.
    ///
    /// # Panics
    /// Must be called from within a tokio runtime (the driver is spawned here).
    pub fn new(strategy: Arc<dyn Strategy<P>>, options: QueueOptions) -> Self {
        Self::with_timer(strategy, options, Arc::new(TokioTimer))
    }

    /// Create a queue with an explicit timer.
    pub fn with_timer(
        strategy: Arc<dyn Strategy<P>>,
        options: QueueOptions,
        timer: Arc<dyn Timer>,
    ) -> Self {
        let options = QueueOptions {
            max_attempts: options.max_attempts.max(1),
            ..options
        };
        let shared = Arc::new(Shared::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let driver = Driver::new(Arc::clone(&shared), strategy, options, timer, rx, tx.downgrade());
        tokio::spawn(driver.run());
        Self {
            shared,
            signals: tx,
        }
    }

    /// Append a task and return a future for its final result.
    ///
    /// The task is visible in `len()` as soon as this returns; the first
    /// scheduling pass for it runs later on the driver.
    pub fn add<R>(&self, payload: P, runner: R) -> Completion<T, E>
    where
        R: Runner<P, T, E>,
    {
        self.add_shared(payload, Arc::new(runner))
    }

    /// Like [`TaskQueue::add`] for a runner shared between many tasks.
    pub fn add_shared(&self, payload: P, runner: Arc<dyn Runner<P, T, E>>) -> Completion<T, E> {
        let (tx, rx) = oneshot::channel();
        let id = {
            let mut tasks = self.shared.tasks();
            // Allocated under the lock so ids follow insertion order.
            let id = TaskId::new(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
            tasks.push(Task::new(id, payload, runner, tx));
            self.shared.subscribers.emit(QueueEvent {
                action: QueueAction::Added,
                id,
                length: tasks.len(),
            });
            id
        };
        // The driver owns a receiver for as long as any sender exists, and
        // `self` holds one, so this cannot fail.
        let _ = self.signals.send(Signal::Wake);
        Completion {
            id,
            rx,
            _driver: self.signals.clone(),
        }
    }

    /// Number of tasks currently stored (queued, running, or awaiting retry).
    pub fn len(&self) -> usize {
        self.shared.tasks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue size broken down by state.
    pub fn status(&self) -> QueueStatus {
        let tasks = self.shared.tasks();
        let mut status = QueueStatus {
            length: tasks.len(),
            ..QueueStatus::default()
        };
        for task in tasks.iter() {
            match task.state {
                TaskState::Queued => status.queued += 1,
                TaskState::Running => status.running += 1,
                TaskState::AwaitingRetry => status.awaiting_retry += 1,
            }
        }
        status
    }

    /// Snapshot of the tasks whose payload matches `predicate`, in queue order.
    pub fn filter<F>(&self, mut predicate: F) -> Vec<TaskSnapshot<P>>
    where
        F: FnMut(&P) -> bool,
    {
        self.shared
            .tasks()
            .iter()
            .filter(|task| predicate(&task.payload))
            .map(|task| TaskSnapshot {
                id: task.id,
                payload: task.payload.clone(),
                attempts: task.attempts,
                state: task.state,
            })
            .collect()
    }

    /// Subscribe to queue-updated events of this instance.
    pub fn subscribe(&self) -> QueueEvents {
        self.shared.subscribers.subscribe()
    }
}

/// Future resolving to a task's final result.
///
/// Holding a `Completion` keeps the queue's driver alive, so awaiting it
/// after dropping every `TaskQueue` handle still works.
pub struct Completion<T, E> {
    id: TaskId,
    rx: oneshot::Receiver<Result<T, TaskError<E>>>,
    _driver: mpsc::UnboundedSender<Signal<T, E>>,
}

impl<T, E> Completion<T, E> {
    /// Id of the task this completion belongs to.
    pub fn id(&self) -> TaskId {
        self.id
    }
}

impl<T, E> Future for Completion<T, E> {
    type Output = Result<T, TaskError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(TaskError::QueueClosed)))
    }
}
