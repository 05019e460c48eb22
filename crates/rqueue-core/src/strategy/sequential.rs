use super::{Strategy, TaskView};

/// Strict FIFO: only the head of the queue may run, one task at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl<P> Strategy<P> for Sequential {
    fn select(&self, tasks: &[TaskView<'_, P>]) -> Vec<bool> {
        let mut selected = vec![false; tasks.len()];
        if let Some(head) = tasks.first() {
            selected[0] = !head.running;
        }
        selected
    }
}
