//! Scheduled work units and their completion handles.

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::error::JobError;

/// A unit of work the scheduler can run and, on transient failure, re-run.
#[async_trait]
pub trait Job: Send + Sync + 'static {
    /// Short label used in log messages.
    fn label(&self) -> String;

    /// Execute the job once.
    async fn run(&self) -> Result<(), JobError>;
}

/// Terminal state of a scheduled task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The task ran to completion.
    Succeeded,

    /// The task failed terminally, either on a fatal error or after
    /// exhausting its attempt budget.
    Failed(JobError),
}

impl TaskOutcome {
    /// Check if the task succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Handle to a task's terminal outcome.
///
/// Dropping the handle detaches from the task without cancelling it; the
/// queue has no cancellation, tasks always run to a terminal state.
pub struct TaskHandle {
    pub(crate) rx: oneshot::Receiver<TaskOutcome>,
}

impl TaskHandle {
    /// Wait for the task to reach a terminal state.
    pub async fn outcome(self) -> TaskOutcome {
        self.rx.await.unwrap_or_else(|_| {
            TaskOutcome::Failed(JobError::Fatal(
                "scheduler shut down before the task completed".to_string(),
            ))
        })
    }
}
