//! The rate-limited task queue.
//!
//! Tasks move `Pending -> Running -> {Succeeded, Failed, Retrying}`;
//! `Retrying` re-enters `Pending` once its backoff delay elapses, and an
//! exhausted attempt budget turns it into `Failed`. A single worker runs
//! tasks one at a time, and no more than `window_cap` tasks start within
//! any `window_duration`.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{Notify, mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::SchedulerConfig;
use crate::task::{Job, TaskHandle, TaskOutcome};

/// A task queued for execution.
struct QueuedTask {
    job: Arc<dyn Job>,
    attempt: u32,
    done: oneshot::Sender<TaskOutcome>,
}

/// Counters describing scheduler activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Total tasks enqueued.
    pub enqueued: u64,

    /// Tasks that reached `Succeeded`.
    pub succeeded: u64,

    /// Tasks that reached `Failed`.
    pub failed: u64,

    /// Retries scheduled after transient failures.
    pub retried: u64,
}

struct Inner {
    config: SchedulerConfig,

    /// Tasks not yet in a terminal state (pending, running, or in backoff).
    active: AtomicUsize,

    /// Notified whenever `active` drops to zero.
    idle: Notify,

    enqueued: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
}

impl Inner {
    fn task_finished(&self) {
        if self.active.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Rate-limited scheduler with exponential-backoff retry.
///
/// Cloning is cheap; clones share the same queue and worker.
#[derive(Clone)]
pub struct Scheduler {
    tx: mpsc::UnboundedSender<QueuedTask>,
    inner: Arc<Inner>,
}

impl Scheduler {
    /// Create a scheduler and spawn its worker on the current runtime.
    pub fn new(config: SchedulerConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            config,
            active: AtomicUsize::new(0),
            idle: Notify::new(),
            enqueued: AtomicU64::new(0),
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            retried: AtomicU64::new(0),
        });

        tokio::spawn(run_worker(inner.clone(), rx));

        Self { tx, inner }
    }

    /// Enqueue a job for execution.
    ///
    /// The returned handle resolves with the task's terminal outcome; it
    /// can be dropped by callers that only care about `on_idle`.
    pub fn enqueue(&self, job: Arc<dyn Job>) -> TaskHandle {
        let (done, rx) = oneshot::channel();

        self.inner.active.fetch_add(1, Ordering::AcqRel);
        self.inner.enqueued.fetch_add(1, Ordering::Relaxed);

        let task = QueuedTask {
            job,
            attempt: 0,
            done,
        };

        if self.tx.send(task).is_err() {
            // Worker gone; only happens when the runtime is shutting down.
            // The dropped sender resolves the handle as failed.
            self.inner.task_finished();
        }

        TaskHandle { rx }
    }

    /// Wait until no task is pending, running, or awaiting retry.
    ///
    /// Resolves even when some tasks ended `Failed`.
    pub async fn on_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            // Register before checking, so a notification landing between
            // the check and the await is not lost.
            notified.as_mut().enable();
            if self.inner.active.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Check whether every task has reached a terminal state.
    pub fn is_idle(&self) -> bool {
        self.inner.active.load(Ordering::Acquire) == 0
    }

    /// Get a snapshot of scheduler counters.
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            enqueued: self.inner.enqueued.load(Ordering::Relaxed),
            succeeded: self.inner.succeeded.load(Ordering::Relaxed),
            failed: self.inner.failed.load(Ordering::Relaxed),
            retried: self.inner.retried.load(Ordering::Relaxed),
        }
    }
}

/// The single worker loop. Serializes execution and enforces the rate
/// window before each dispatch.
async fn run_worker(inner: Arc<Inner>, mut rx: mpsc::UnboundedReceiver<QueuedTask>) {
    let mut window: VecDeque<Instant> = VecDeque::new();
    let mut backoff: Vec<(Instant, QueuedTask)> = Vec::new();

    loop {
        let Some(task) = next_task(&mut rx, &mut backoff).await else {
            break;
        };

        wait_for_budget(&inner.config, &mut window).await;
        window.push_back(Instant::now());

        let QueuedTask { job, attempt, done } = task;
        debug!("task {} running, attempt {}", job.label(), attempt + 1);

        match job.run().await {
            Ok(()) => {
                inner.succeeded.fetch_add(1, Ordering::Relaxed);
                let _ = done.send(TaskOutcome::Succeeded);
                inner.task_finished();
            }
            Err(err) if err.is_transient() && attempt + 1 < inner.config.max_attempts => {
                let delay = inner.config.backoff_delay(attempt);
                debug!(
                    "task {} failed transiently ({err}), retrying in {delay:?}",
                    job.label()
                );
                inner.retried.fetch_add(1, Ordering::Relaxed);
                backoff.push((
                    Instant::now() + delay,
                    QueuedTask {
                        job,
                        attempt: attempt + 1,
                        done,
                    },
                ));
            }
            Err(err) => {
                warn!("task {} failed: {err}", job.label());
                inner.failed.fetch_add(1, Ordering::Relaxed);
                let _ = done.send(TaskOutcome::Failed(err));
                inner.task_finished();
            }
        }
    }
}

/// Wait for the next runnable task: a due retry, a newly enqueued task,
/// or the earliest backoff expiry, whichever comes first. Returns `None`
/// once the queue is closed and fully drained.
async fn next_task(
    rx: &mut mpsc::UnboundedReceiver<QueuedTask>,
    backoff: &mut Vec<(Instant, QueuedTask)>,
) -> Option<QueuedTask> {
    loop {
        let now = Instant::now();
        if let Some(due) = backoff.iter().position(|(at, _)| *at <= now) {
            return Some(backoff.swap_remove(due).1);
        }

        match backoff.iter().map(|(at, _)| *at).min() {
            Some(earliest) => {
                tokio::select! {
                    received = rx.recv() => match received {
                        Some(task) => return Some(task),
                        // Queue closed; wait out the remaining retries.
                        None => tokio::time::sleep_until(earliest).await,
                    },
                    () = tokio::time::sleep_until(earliest) => {}
                }
            }
            None => return rx.recv().await,
        }
    }
}

/// Block until dispatching one more task would not exceed the window cap.
async fn wait_for_budget(config: &SchedulerConfig, window: &mut VecDeque<Instant>) {
    loop {
        let now = Instant::now();
        while window
            .front()
            .is_some_and(|start| now.duration_since(*start) >= config.window_duration)
        {
            window.pop_front();
        }

        if window.len() < config.window_cap {
            return;
        }

        if let Some(oldest) = window.front() {
            tokio::time::sleep_until(*oldest + config.window_duration).await;
        }
    }
}
