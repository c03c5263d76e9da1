//! Simulated sleep-monitoring engine.
//!
//! [`Monitor`] owns every piece of mutable state and is driven by an
//! injected [`Scheduler`] and [`sleep_core::RandomSource`].

pub mod anomaly;
pub mod classifier;
pub mod config;
pub mod demo;
pub mod error;
pub mod export;
pub mod monitor;
pub mod recommendation;
pub mod scheduler;
pub mod sensor_model;
pub mod session;
pub mod stats;

#[cfg(test)]
mod tests;

pub use anomaly::AnomalyDetector;
pub use classifier::StageClassifier;
pub use config::{ConfigError, InitialReadings, MonitorConfig};
pub use demo::{demo_history, DemoHistory};
pub use error::EngineError;
pub use export::ExportDocument;
pub use monitor::{CategoryFilter, Monitor};
pub use recommendation::{RecommendationGenerator, RecommendationRule};
pub use scheduler::{Fired, Scheduler, SchedulerError, Task, TaskHandle, VirtualScheduler, WallScheduler};
pub use sensor_model::SensorModel;
pub use session::{MonitoringState, SessionManager, Transition};
pub use stats::{format_hours_minutes, SessionSummary, UserStats};
