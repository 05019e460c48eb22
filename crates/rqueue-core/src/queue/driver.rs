//! The single scheduling loop behind a `TaskQueue`.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::{Outcome, QueueAction, QueueOptions, Runner, Shared, TaskError, TaskId, TaskState, Timer};
use crate::strategy::{Strategy, TaskView};

/// Everything that can trigger a scheduling pass.
pub(crate) enum Signal<T, E> {
    /// A task was added.
    Wake,
    /// An attempt finished.
    Settled { id: TaskId, outcome: Outcome<T, E> },
    /// A task's retry wait elapsed.
    RetryDue(TaskId),
}

/// One admitted attempt, collected under the lock and started after it.
struct Launch<P, T, E> {
    id: TaskId,
    attempt: u32,
    payload: P,
    runner: Arc<dyn Runner<P, T, E>>,
}

pub(crate) struct Driver<P, T, E> {
    shared: Arc<Shared<P, T, E>>,
    strategy: Arc<dyn Strategy<P>>,
    options: QueueOptions,
    timer: Arc<dyn Timer>,
    rx: mpsc::UnboundedReceiver<Signal<T, E>>,
    // Weak so the loop ends once handles, completions and in-flight work are gone.
    signals: mpsc::WeakUnboundedSender<Signal<T, E>>,
}

impl<P, T, E> Driver<P, T, E>
where
    P: Clone + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    pub(crate) fn new(
        shared: Arc<Shared<P, T, E>>,
        strategy: Arc<dyn Strategy<P>>,
        options: QueueOptions,
        timer: Arc<dyn Timer>,
        rx: mpsc::UnboundedReceiver<Signal<T, E>>,
        signals: mpsc::WeakUnboundedSender<Signal<T, E>>,
    ) -> Self {
        Self {
            shared,
            strategy,
            options,
            timer,
            rx,
            signals,
        }
    }

    pub(crate) async fn run(mut self) {
        while let Some(signal) = self.rx.recv().await {
            match signal {
                Signal::Wake => {}
                Signal::Settled { id, outcome } => self.settle(id, outcome),
                Signal::RetryDue(id) => self.requeue(id),
            }
            self.process_pass();
        }
        self.close();
    }

    /// Ask the strategy which tasks to admit and start one attempt for each.
    fn process_pass(&self) {
        let launches: Vec<Launch<P, T, E>> = {
            let mut tasks = self.shared.tasks();
            let decisions = {
                let views: Vec<TaskView<'_, P>> = tasks
                    .iter()
                    .map(|task| TaskView::new(task.id, &task.payload, task.state.is_running()))
                    .collect();
                self.strategy.select(&views)
            };
            if decisions.len() != tasks.len() {
                tracing::warn!(
                    tasks = tasks.len(),
                    decisions = decisions.len(),
                    "strategy returned a decision vector of the wrong length; missing entries count as not selected"
                );
            }
            tasks
                .iter_mut()
                .zip(decisions.into_iter().chain(std::iter::repeat(false)))
                .filter(|(task, selected)| *selected && task.state == TaskState::Queued)
                .map(|(task, _)| {
                    let attempt = task.start_attempt();
                    Launch {
                        id: task.id,
                        attempt,
                        payload: task.payload.clone(),
                        runner: Arc::clone(&task.runner),
                    }
                })
                .collect()
        };

        for launch in launches {
            self.launch(launch);
        }
    }

    fn launch(&self, launch: Launch<P, T, E>) {
        let Some(signals) = self.signals.upgrade() else {
            return;
        };
        let Launch {
            id,
            attempt,
            payload,
            runner,
        } = launch;
        tracing::debug!(id = %id, attempt, "starting attempt");

        let handle = tokio::spawn(runner.run(payload));
        tokio::spawn(async move {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::warn!(id = %id, error = %err, "attempt aborted without an outcome");
                    Outcome::Failure {
                        error: None,
                        code: None,
                    }
                }
            };
            let _ = signals.send(Signal::Settled { id, outcome });
        });
    }

    fn settle(&self, id: TaskId, outcome: Outcome<T, E>) {
        match outcome {
            Outcome::Success(value) => {
                if let Some(task) = self.shared.remove(id, QueueAction::Processed) {
                    tracing::debug!(id = %id, attempts = task.attempts, "task succeeded");
                    task.resolve(Ok(value));
                }
            }
            Outcome::Retry => self.retry(id),
            Outcome::Failure { error, code } => {
                if let Some(task) = self.shared.remove(id, QueueAction::Failure) {
                    tracing::debug!(id = %id, code = ?code, "task failed");
                    let err = match error {
                        Some(error) => TaskError::Failed { error, code },
                        None => TaskError::Unknown { code },
                    };
                    task.resolve(Err(err));
                }
            }
        }
    }

    fn retry(&self, id: TaskId) {
        let exhausted = {
            let mut tasks = self.shared.tasks();
            let Some(task) = tasks.iter_mut().find(|t| t.id == id) else {
                return;
            };
            if task.attempts >= self.options.max_attempts {
                Some(task.attempts)
            } else {
                task.state = TaskState::AwaitingRetry;
                None
            }
        };

        match exhausted {
            Some(attempts) => {
                tracing::warn!(id = %id, attempts, "retries exhausted");
                if let Some(task) = self.shared.remove(id, QueueAction::Failure) {
                    task.resolve(Err(TaskError::MaxRetriesExceeded { attempts }));
                }
            }
            None => {
                let Some(signals) = self.signals.upgrade() else {
                    return;
                };
                tracing::debug!(id = %id, wait_ms = self.options.wait_time.as_millis() as u64, "retry scheduled");
                let wait = self.timer.sleep(self.options.wait_time);
                tokio::spawn(async move {
                    wait.await;
                    let _ = signals.send(Signal::RetryDue(id));
                });
            }
        }
    }

    fn requeue(&self, id: TaskId) {
        let mut tasks = self.shared.tasks();
        if let Some(task) = tasks
            .iter_mut()
            .find(|t| t.id == id && t.state == TaskState::AwaitingRetry)
        {
            task.state = TaskState::Queued;
        }
    }

    /// Resolve whatever is left once no handle can reach the queue anymore.
    fn close(&self) {
        let remaining = std::mem::take(&mut *self.shared.tasks());
        if !remaining.is_empty() {
            tracing::debug!(count = remaining.len(), "queue closed with pending tasks");
        }
        for task in remaining {
            task.resolve(Err(TaskError::QueueClosed));
        }
    }
}
