//! Queue-updated events and per-instance subscribers.

use std::fmt;
use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::mpsc;

use super::TaskId;

/// What happened to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueAction {
    /// A task was appended.
    Added,
    /// A task succeeded and was removed.
    Processed,
    /// A task failed terminally (or exhausted its retries) and was removed.
    Failure,
}

impl fmt::Display for QueueAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueueAction::Added => "added",
            QueueAction::Processed => "processed",
            QueueAction::Failure => "failure",
        };
        f.write_str(s)
    }
}

/// Notification of an insertion or removal with the resulting queue length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueEvent {
    pub action: QueueAction,
    pub id: TaskId,
    pub length: usize,
}

/// Receiving half of a queue subscription. Events arrive in emission order.
pub type QueueEvents = mpsc::UnboundedReceiver<QueueEvent>;

/// Subscribers of one queue instance.
///
/// Delivery goes through unbounded channels so a subscriber is never called
/// back while the queue is mid-update. Closed subscribers are pruned on emit.
#[derive(Default)]
pub(crate) struct Subscribers {
    senders: Mutex<Vec<mpsc::UnboundedSender<QueueEvent>>>,
}

impl Subscribers {
    pub(crate) fn subscribe(&self) -> QueueEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(tx);
        rx
    }

    pub(crate) fn emit(&self, event: QueueEvent) {
        tracing::debug!(
            id = %event.id,
            action = %event.action,
            length = event.length,
            "queue updated"
        );
        self.senders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .retain(|tx| tx.send(event).is_ok());
    }
}
