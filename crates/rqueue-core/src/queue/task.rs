//! Task records held by the queue.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::oneshot;

use super::{Runner, TaskError};

/// Queue-assigned task identifier. Monotonically increasing per queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TaskId(u64);

impl TaskId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a task while it is stored in the queue.
///
/// Done and failed tasks are not stored; they are removed.
///
/// - Queued -> Running -> (removed)
/// - Queued -> Running -> AwaitingRetry -> Queued (until attempts are exhausted)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Eligible for selection.
    Queued,
    /// An attempt is outstanding.
    Running,
    /// Last attempt failed transiently; waiting out the retry delay.
    AwaitingRetry,
}

impl TaskState {
    /// Strategies see a task as running unless it is eligible for selection.
    pub fn is_running(self) -> bool {
        !matches!(self, TaskState::Queued)
    }
}

pub(crate) type Resolver<T, E> = oneshot::Sender<Result<T, TaskError<E>>>;

/// One queued unit of work.
pub(crate) struct Task<P, T, E> {
    pub(crate) id: TaskId,
    pub(crate) payload: P,
    pub(crate) attempts: u32,
    pub(crate) state: TaskState,
    pub(crate) runner: Arc<dyn Runner<P, T, E>>,
    resolver: Option<Resolver<T, E>>,
}

impl<P, T, E> Task<P, T, E> {
    pub(crate) fn new(
        id: TaskId,
        payload: P,
        runner: Arc<dyn Runner<P, T, E>>,
        resolver: Resolver<T, E>,
    ) -> Self {
        Self {
            id,
            payload,
            attempts: 0,
            state: TaskState::Queued,
            runner,
            resolver: Some(resolver),
        }
    }

    /// Mark as running and count the attempt. Returns the attempt number.
    pub(crate) fn start_attempt(&mut self) -> u32 {
        self.state = TaskState::Running;
        self.attempts += 1;
        self.attempts
    }

    /// Deliver the final result. A dropped receiver is not an error.
    pub(crate) fn resolve(mut self, result: Result<T, TaskError<E>>) {
        if let Some(tx) = self.resolver.take() {
            let _ = tx.send(result);
        }
    }
}

/// Read-only copy of a queued task, returned by `filter`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSnapshot<P> {
    pub id: TaskId,
    pub payload: P,
    pub attempts: u32,
    pub state: TaskState,
}

/// Queue size broken down by task state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    pub length: usize,
    pub queued: usize,
    pub running: usize,
    pub awaiting_retry: usize,
}
