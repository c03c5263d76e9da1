use crate::sensor::VitalSigns;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SleepStage {
    Awake,
    Light,
    Deep,
    Rem,
}

/// One reading collected while a session is open.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SamplePoint {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub vitals: VitalSigns,
    pub stage: SleepStage,
}

/// A bounded monitoring interval. Duration and stage totals are in hours.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub stages: Vec<SleepStage>,
    pub metrics: Vec<SamplePoint>,
    pub duration: f64,
    pub efficiency: f64,
    pub deep_sleep: f64,
    pub rem_sleep: f64,
    pub light_sleep: f64,
    pub score: u32,
}

impl Session {
    pub fn open(id: Uuid, start_time: DateTime<Utc>) -> Self {
        Self {
            id,
            start_time,
            end_time: None,
            stages: Vec::new(),
            metrics: Vec::new(),
            duration: 0.0,
            efficiency: 0.0,
            deep_sleep: 0.0,
            rem_sleep: 0.0,
            light_sleep: 0.0,
            score: 0,
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn record(&mut self, sample: SamplePoint) {
        self.stages.push(sample.stage);
        self.metrics.push(sample);
    }

    /// Sum of the per-stage hours; equals `duration` once metrics are computed.
    pub fn staged_hours(&self) -> f64 {
        self.deep_sleep + self.rem_sleep + self.light_sleep
    }

    pub fn summary_metrics(&self) -> SessionMetrics {
        SessionMetrics {
            sleep_efficiency: self.efficiency,
        }
    }
}

/// Aggregate metrics consumed by recommendation rules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetrics {
    pub sleep_efficiency: f64,
}
