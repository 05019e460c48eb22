//! Task-selection strategies.
//!
//! A strategy maps the current queue snapshot to one "run now" decision per
//! task. It sees only each task's payload and running flag, in insertion
//! order, and must be a pure function of that snapshot: the queue recomputes
//! decisions from scratch on every pass.

mod parallel;
mod priority;
mod sequential;

pub use parallel::Parallel;
pub use priority::{Priority, WriteClass};
pub use sequential::Sequential;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::queue::TaskId;

/// What a strategy sees of one task.
#[derive(Debug)]
pub struct TaskView<'a, P> {
    pub id: TaskId,
    pub payload: &'a P,
    pub running: bool,
}

impl<'a, P> TaskView<'a, P> {
    pub fn new(id: TaskId, payload: &'a P, running: bool) -> Self {
        Self {
            id,
            payload,
            running,
        }
    }
}

impl<P> Clone for TaskView<'_, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for TaskView<'_, P> {}

/// Selects which tasks to admit on a scheduling pass.
///
/// Implementations return one `bool` per input position. They are called
/// while the queue is locked and must not call back into the queue.
pub trait Strategy<P>: Send + Sync {
    fn select(&self, tasks: &[TaskView<'_, P>]) -> Vec<bool>;
}

/// Built-in strategies, selectable by name (e.g. from config).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Run every task that is not running.
    Parallel,
    /// Strict FIFO, one outstanding task.
    Sequential,
    /// Reads run freely; writes run one at a time in submission order.
    #[default]
    Priority,
}

impl StrategyKind {
    pub fn build<P: WriteClass + 'static>(self) -> Arc<dyn Strategy<P>> {
        match self {
            StrategyKind::Parallel => Arc::new(Parallel),
            StrategyKind::Sequential => Arc::new(Sequential),
            StrategyKind::Priority => Arc::new(Priority),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Parallel => "parallel",
            StrategyKind::Sequential => "sequential",
            StrategyKind::Priority => "priority",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown strategy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown strategy `{0}` (expected parallel, sequential or priority)")]
pub struct UnknownStrategy(pub String);

impl FromStr for StrategyKind {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "parallel" | "all" => Ok(StrategyKind::Parallel),
            "sequential" => Ok(StrategyKind::Sequential),
            "priority" | "sequentialpost" | "sequential-post" => Ok(StrategyKind::Priority),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}
