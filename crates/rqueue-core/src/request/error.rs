use thiserror::Error;

use crate::queue::TaskError;

/// Why a queued request was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// Method other than GET, POST or DELETE; the transport was not contacted.
    #[error("unknown request method {0}")]
    UnsupportedMethod(String),

    /// Non-retryable failure reported by the transport (e.g. HTTP 4xx).
    #[error("{reason}")]
    Client { status: Option<u16>, reason: String },

    /// Every allowed attempt failed transiently.
    #[error("max retries reached after {attempts} attempts")]
    MaxRetriesExceeded { attempts: u32 },

    /// The attempt ended without an error value.
    #[error("unknown error")]
    Unknown { status: Option<u16> },

    /// The queue stopped before the request completed.
    #[error("request queue shut down")]
    QueueClosed,
}

impl RequestError {
    /// HTTP status associated with the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Client { status, .. } | RequestError::Unknown { status } => *status,
            RequestError::UnsupportedMethod(_)
            | RequestError::MaxRetriesExceeded { .. }
            | RequestError::QueueClosed => None,
        }
    }
}

impl From<TaskError<RequestError>> for RequestError {
    fn from(err: TaskError<RequestError>) -> Self {
        match err {
            TaskError::Failed { error, .. } => error,
            TaskError::MaxRetriesExceeded { attempts } => {
                RequestError::MaxRetriesExceeded { attempts }
            }
            TaskError::Unknown { code } => RequestError::Unknown { status: code },
            TaskError::QueueClosed => RequestError::QueueClosed,
        }
    }
}
