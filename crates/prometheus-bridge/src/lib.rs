pub mod metrics;

pub use metrics::{movement_gauge_value, MonitorMetrics};
