use super::{Strategy, TaskView};

/// Classifies payloads into reads and writes for [`Priority`].
pub trait WriteClass {
    /// Writes must run one at a time, in submission order.
    fn is_write(&self) -> bool;
}

/// Reads run freely and concurrently; writes serialize.
///
/// Every non-write task that is not running is admitted. Among writes only
/// the earliest one is considered, and it is admitted only if it is not
/// already running, so a later write never starts while an earlier one is
/// queued, running, or waiting to retry.
#[derive(Debug, Clone, Copy, Default)]
pub struct Priority;

impl<P: WriteClass> Strategy<P> for Priority {
    fn select(&self, tasks: &[TaskView<'_, P>]) -> Vec<bool> {
        let mut selected: Vec<bool> = tasks
            .iter()
            .map(|task| !task.payload.is_write() && !task.running)
            .collect();
        if let Some(first_write) = tasks.iter().position(|task| task.payload.is_write()) {
            selected[first_write] = !tasks[first_write].running;
        }
        selected
    }
}
