//! # Scheduler
//!
//! This crate provides the rate-limited task queue that drives calls to
//! the embedding provider.
//!
//! ## Guarantees
//!
//! - **Serialized dispatch**: exactly one task runs at a time
//! - **Rate budget**: at most `window_cap` task starts per `window_duration`;
//!   dispatch is delayed, never dropped
//! - **Retry with backoff**: transient failures are re-enqueued with
//!   exponential backoff up to an attempt budget; terminal failures never
//!   stop the queue
//! - **Idle tracking**: `on_idle` resolves once every task has reached a
//!   terminal state, failures included

pub mod config;
pub mod error;
pub mod queue;
pub mod task;

pub use config::SchedulerConfig;
pub use error::JobError;
pub use queue::{Scheduler, SchedulerStats};
pub use task::{Job, TaskHandle, TaskOutcome};
