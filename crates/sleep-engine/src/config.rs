use crate::sensor_model::numeric_rule;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use sleep_core::{ChannelId, MovementLevel};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Intervals longer than a day are rejected.
pub const MAX_INTERVAL_MS: u64 = 86_400_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config validation error: {0}")]
    Validation(String),
}

/// Starting value of every channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct InitialReadings {
    pub heart_rate: f64,
    pub breathing_rate: f64,
    pub body_temp: f64,
    pub movement: MovementLevel,
    pub oxygen: f64,
    pub noise: f64,
}

impl Default for InitialReadings {
    fn default() -> Self {
        Self {
            heart_rate: 72.0,
            breathing_rate: 16.0,
            body_temp: 36.5,
            movement: MovementLevel::Low,
            oxygen: 98.0,
            noise: 35.0,
        }
    }
}

impl InitialReadings {
    pub fn level(&self, id: ChannelId) -> Option<f64> {
        match id {
            ChannelId::HeartRate => Some(self.heart_rate),
            ChannelId::BreathingRate => Some(self.breathing_rate),
            ChannelId::BodyTemp => Some(self.body_temp),
            ChannelId::Oxygen => Some(self.oxygen),
            ChannelId::Noise => Some(self.noise),
            ChannelId::Movement => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitorConfig {
    pub sensor_interval_ms: u64,
    pub connection_interval_ms: u64,
    pub sample_interval_ms: u64,
    /// Chance that a connection-status tick reports the link as up.
    pub link_up_probability: f64,
    pub initial: InitialReadings,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sensor_interval_ms: 2_000,
            connection_interval_ms: 5_000,
            sample_interval_ms: 30_000,
            link_up_probability: 0.9,
            initial: InitialReadings::default(),
        }
    }
}

impl MonitorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let cfg: MonitorConfig = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, ms) in [
            ("sensorIntervalMs", self.sensor_interval_ms),
            ("connectionIntervalMs", self.connection_interval_ms),
            ("sampleIntervalMs", self.sample_interval_ms),
        ] {
            if ms == 0 || ms > MAX_INTERVAL_MS {
                return Err(ConfigError::Validation(format!(
                    "{name}={ms} must be within 1..={MAX_INTERVAL_MS}"
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.link_up_probability) {
            return Err(ConfigError::Validation(format!(
                "linkUpProbability={} must be within [0, 1]",
                self.link_up_probability
            )));
        }

        for id in ChannelId::ALL {
            let (Some(rule), Some(value)) = (numeric_rule(id), self.initial.level(id)) else {
                continue;
            };
            if !(rule.min..=rule.max).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "initial {id}={value} outside [{}, {}]",
                    rule.min, rule.max
                )));
            }
        }
        Ok(())
    }

    pub fn sensor_interval(&self) -> Duration {
        millis(self.sensor_interval_ms)
    }

    pub fn connection_interval(&self) -> Duration {
        millis(self.connection_interval_ms)
    }

    pub fn sample_interval(&self) -> Duration {
        millis(self.sample_interval_ms)
    }
}

fn millis(ms: u64) -> Duration {
    Duration::milliseconds(ms.min(MAX_INTERVAL_MS) as i64)
}
