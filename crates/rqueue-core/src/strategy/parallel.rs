use super::{Strategy, TaskView};

/// Admit every task that is not already running. Maximum concurrency.
#[derive(Debug, Clone, Copy, Default)]
pub struct Parallel;

impl<P> Strategy<P> for Parallel {
    fn select(&self, tasks: &[TaskView<'_, P>]) -> Vec<bool> {
        tasks.iter().map(|task| !task.running).collect()
    }
}
