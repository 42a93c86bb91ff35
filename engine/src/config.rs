//! Configuration for the engine.

use serde::{Deserialize, Serialize};

use notemesh_scheduler::SchedulerConfig;

/// Configuration for the related-notes engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of documents per embedding batch. Kept small enough to
    /// respect provider per-call limits; 1 recovers single-document
    /// behavior.
    pub batch_size: usize,

    /// Number of related notes returned by default.
    pub top_k: usize,

    /// Scheduler configuration.
    pub scheduler: SchedulerConfig,
}

impl EngineConfig {
    /// Set the embedding batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the default result count.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the scheduler configuration.
    pub fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            top_k: 5,
            scheduler: SchedulerConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.top_k, 5);
        assert_eq!(config.scheduler.max_attempts, 5);
    }

    #[test]
    fn test_batch_size_floor() {
        let config = EngineConfig::default().with_batch_size(0);
        assert_eq!(config.batch_size, 1);
    }
}
