use chrono::{DateTime, Utc};
use sleep_core::{Anomaly, AnomalyKind, IdSequence, MovementLevel, Severity, VitalSigns};

/// Heart rate strictly above this value is an anomaly.
pub const HEART_RATE_LIMIT: f64 = 100.0;

/// Stateless threshold rules. Each rule is evaluated independently.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnomalyDetector;

impl AnomalyDetector {
    pub fn detect(
        &self,
        vitals: &VitalSigns,
        at: DateTime<Utc>,
        ids: &mut IdSequence,
    ) -> Vec<Anomaly> {
        let mut found = Vec::new();

        if vitals.heart_rate > HEART_RATE_LIMIT {
            found.push(Anomaly {
                id: ids.next_id(),
                kind: AnomalyKind::HighHeartRate,
                severity: Severity::High,
                message: format!("Elevated heart rate detected ({:.0} BPM)", vitals.heart_rate),
                timestamp: at,
                duration: None,
            });
        }

        if vitals.movement == MovementLevel::High {
            found.push(Anomaly {
                id: ids.next_id(),
                kind: AnomalyKind::ExcessiveMovement,
                severity: Severity::Medium,
                message: "Excessive movement during sleep".to_string(),
                timestamp: at,
                duration: None,
            });
        }

        found
    }
}
