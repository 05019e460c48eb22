//! Attempt outcomes and task-level errors.

use thiserror::Error;

/// Result of a single attempt, reported by a runner back to the queue.
///
/// Exactly one outcome is produced per admitted attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T, E> {
    /// The attempt succeeded; the task is removed and resolved with the value.
    Success(T),
    /// Transient failure; the task is retried after the queue's wait time
    /// unless its attempts are exhausted.
    Retry,
    /// Terminal failure; the task is removed regardless of remaining attempts.
    Failure {
        error: Option<E>,
        code: Option<u16>,
    },
}

impl<T, E> Outcome<T, E> {
    /// Terminal failure carrying an error value and no status code.
    pub fn failure(error: E) -> Self {
        Outcome::Failure {
            error: Some(error),
            code: None,
        }
    }

    /// Terminal failure carrying an error value and a status code.
    pub fn failure_with_code(error: E, code: u16) -> Self {
        Outcome::Failure {
            error: Some(error),
            code: Some(code),
        }
    }
}

/// Why a task resolved without a value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError<E> {
    /// Every allowed attempt reported a transient failure.
    #[error("max retries reached after {attempts} attempts")]
    MaxRetriesExceeded { attempts: u32 },

    /// The runner reported a terminal failure.
    #[error("{error}")]
    Failed {
        #[source]
        error: E,
        code: Option<u16>,
    },

    /// The runner reported a terminal failure without an error value.
    #[error("unknown error")]
    Unknown { code: Option<u16> },

    /// The queue's driver stopped before the task completed.
    #[error("task queue shut down before the task completed")]
    QueueClosed,
}

impl<E> TaskError<E> {
    /// Status code reported alongside a terminal failure, if any.
    pub fn code(&self) -> Option<u16> {
        match self {
            TaskError::Failed { code, .. } | TaskError::Unknown { code } => *code,
            TaskError::MaxRetriesExceeded { .. } | TaskError::QueueClosed => None,
        }
    }
}
