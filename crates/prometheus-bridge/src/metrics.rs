use prometheus::{
    register_gauge_vec_with_registry, register_int_gauge_vec_with_registry,
    register_int_gauge_with_registry, Encoder, GaugeVec, IntGauge, IntGaugeVec, Registry,
    TextEncoder,
};
use sleep_core::{ChannelStatus, ChannelValue, MovementLevel, RandomSource};
use sleep_engine::{Monitor, Scheduler};

/// Gauges mirroring one monitor, kept on their own registry so several
/// monitors (or tests) never collide on metric names.
pub struct MonitorMetrics {
    registry: Registry,
    pub sensor_value: GaugeVec,
    pub sensor_warning: IntGaugeVec,
    pub sensor_connected: IntGaugeVec,
    pub monitoring: IntGauge,
    pub link_connected: IntGauge,
    pub sessions: IntGauge,
    pub open_session_samples: IntGauge,
    pub anomalies: IntGauge,
    pub recommendations_open: IntGauge,
}

/// Movement is exported as 0 (low), 1 (medium) or 2 (high).
pub fn movement_gauge_value(level: MovementLevel) -> f64 {
    match level {
        MovementLevel::Low => 0.0,
        MovementLevel::Medium => 1.0,
        MovementLevel::High => 2.0,
    }
}

fn flag(on: bool) -> i64 {
    i64::from(on)
}

impl MonitorMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let sensor_value = register_gauge_vec_with_registry!(
            "sleepsync_sensor_value",
            "Current simulated reading per sensor channel",
            &["channel"],
            registry
        )?;

        let sensor_warning = register_int_gauge_vec_with_registry!(
            "sleepsync_sensor_warning",
            "1 when the channel is outside its comfortable band",
            &["channel"],
            registry
        )?;

        let sensor_connected = register_int_gauge_vec_with_registry!(
            "sleepsync_sensor_connected",
            "1 when the channel is connected",
            &["channel"],
            registry
        )?;

        let monitoring = register_int_gauge_with_registry!(
            "sleepsync_monitoring",
            "1 while a monitoring session is running",
            registry
        )?;

        let link_connected = register_int_gauge_with_registry!(
            "sleepsync_link_connected",
            "Result of the last connection-status tick",
            registry
        )?;

        let sessions = register_int_gauge_with_registry!(
            "sleepsync_sessions",
            "Sealed sessions in history",
            registry
        )?;

        let open_session_samples = register_int_gauge_with_registry!(
            "sleepsync_open_session_samples",
            "Sample points collected in the open session",
            registry
        )?;

        let anomalies = register_int_gauge_with_registry!(
            "sleepsync_anomalies",
            "Anomalies recorded so far",
            registry
        )?;

        let recommendations_open = register_int_gauge_with_registry!(
            "sleepsync_recommendations_open",
            "Recommendations not yet marked completed",
            registry
        )?;

        Ok(Self {
            registry,
            sensor_value,
            sensor_warning,
            sensor_connected,
            monitoring,
            link_connected,
            sessions,
            open_session_samples,
            anomalies,
            recommendations_open,
        })
    }

    pub fn observe<R: RandomSource, S: Scheduler>(&self, monitor: &Monitor<R, S>) {
        for channel in monitor.sensor_snapshot().channels() {
            let label = channel.id.name();
            let value = match channel.value {
                ChannelValue::Level(v) => v,
                ChannelValue::Movement(level) => movement_gauge_value(level),
            };
            self.sensor_value.with_label_values(&[label]).set(value);
            self.sensor_warning
                .with_label_values(&[label])
                .set(flag(channel.status == ChannelStatus::Warning));
            self.sensor_connected
                .with_label_values(&[label])
                .set(flag(channel.connected));
        }

        self.monitoring.set(flag(monitor.is_monitoring()));
        self.link_connected.set(flag(monitor.link_connected()));
        self.sessions.set(monitor.session_history().len() as i64);
        self.open_session_samples
            .set(monitor.open_session().map_or(0, |s| s.metrics.len() as i64));
        self.anomalies.set(monitor.anomalies().len() as i64);
        self.recommendations_open.set(
            monitor
                .recommendations()
                .iter()
                .filter(|r| !r.completed)
                .count() as i64,
        );
    }

    /// Text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
