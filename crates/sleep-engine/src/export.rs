use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sleep_core::{Anomaly, Recommendation, Session};

/// Everything a user can download: history, anomalies and recommendations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub sessions: Vec<Session>,
    pub anomalies: Vec<Anomaly>,
    pub recommendations: Vec<Recommendation>,
    pub export_date: DateTime<Utc>,
}

impl ExportDocument {
    pub fn to_json_pretty(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// `sleepsync-data-YYYY-MM-DD.json`, dated by the export timestamp.
    pub fn file_name(&self) -> String {
        format!("sleepsync-data-{}.json", self.export_date.format("%Y-%m-%d"))
    }
}
