//! Error types for scheduled jobs.

use thiserror::Error;

/// A job failure, classified by the job itself.
///
/// The scheduler never inspects failure text to decide whether to retry;
/// the classification travels on the error variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// Transient failure; the task may be retried with backoff.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Terminal failure; the task is failed without retry.
    #[error("task failed: {0}")]
    Fatal(String),
}

impl JobError {
    /// Whether this failure should be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
