use crate::config::ConfigError;
use crate::scheduler::SchedulerError;
use sleep_core::RandomSourceError;
use thiserror::Error;

/// Failures that reach the caller. Guarded no-op transitions are not errors;
/// they come back as warning [`crate::Transition`] values.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("random source failed: {0}")]
    RandomSource(#[from] RandomSourceError),
    #[error("scheduler failed: {0}")]
    Scheduler(#[from] SchedulerError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("export serialization failed: {0}")]
    Export(#[from] serde_json::Error),
}
