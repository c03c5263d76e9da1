use serde::{Deserialize, Serialize};
use std::fmt;

/// The six simulated channels, in display order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ChannelId {
    HeartRate,
    BreathingRate,
    BodyTemp,
    Movement,
    Oxygen,
    Noise,
}

impl ChannelId {
    pub const ALL: [ChannelId; 6] = [
        ChannelId::HeartRate,
        ChannelId::BreathingRate,
        ChannelId::BodyTemp,
        ChannelId::Movement,
        ChannelId::Oxygen,
        ChannelId::Noise,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ChannelId::HeartRate => "heartRate",
            ChannelId::BreathingRate => "breathingRate",
            ChannelId::BodyTemp => "bodyTemp",
            ChannelId::Movement => "movement",
            ChannelId::Oxygen => "oxygen",
            ChannelId::Noise => "noise",
        }
    }

    /// Position of the channel inside a snapshot.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MovementLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for MovementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MovementLevel::Low => "low",
            MovementLevel::Medium => "medium",
            MovementLevel::High => "high",
        };
        f.write_str(label)
    }
}

/// Numeric channels carry a level; the movement channel carries a category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ChannelValue {
    Level(f64),
    Movement(MovementLevel),
}

impl ChannelValue {
    pub fn as_level(self) -> Option<f64> {
        match self {
            ChannelValue::Level(v) => Some(v),
            ChannelValue::Movement(_) => None,
        }
    }

    pub fn as_movement(self) -> Option<MovementLevel> {
        match self {
            ChannelValue::Movement(m) => Some(m),
            ChannelValue::Level(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    Normal,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorChannel {
    pub id: ChannelId,
    pub value: ChannelValue,
    pub status: ChannelStatus,
    pub connected: bool,
}

/// The subset of readings stored with every sample and fed to anomaly rules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VitalSigns {
    pub heart_rate: f64,
    pub breathing_rate: f64,
    pub body_temp: f64,
    pub movement: MovementLevel,
}

/// Point-in-time copy of every channel, indexed by [`ChannelId::index`].
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SensorSnapshot {
    channels: Vec<SensorChannel>,
}

impl SensorSnapshot {
    /// Builds a snapshot from channels given in [`ChannelId::ALL`] order.
    /// Returns `None` if a channel is missing or out of order.
    pub fn from_channels(channels: Vec<SensorChannel>) -> Option<Self> {
        let complete = channels.len() == ChannelId::ALL.len()
            && channels
                .iter()
                .zip(ChannelId::ALL)
                .all(|(c, id)| c.id == id);
        complete.then_some(Self { channels })
    }

    /// Builds a connected snapshot, asking `reading` for each channel in order.
    pub fn from_fn(mut reading: impl FnMut(ChannelId) -> (ChannelValue, ChannelStatus)) -> Self {
        let channels = ChannelId::ALL
            .iter()
            .map(|&id| {
                let (value, status) = reading(id);
                SensorChannel {
                    id,
                    value,
                    status,
                    connected: true,
                }
            })
            .collect();
        Self { channels }
    }

    pub fn set_reading(&mut self, id: ChannelId, value: ChannelValue, status: ChannelStatus) {
        let channel = &mut self.channels[id.index()];
        channel.value = value;
        channel.status = status;
    }

    pub fn set_connected(&mut self, id: ChannelId, connected: bool) {
        self.channels[id.index()].connected = connected;
    }

    pub fn channels(&self) -> &[SensorChannel] {
        &self.channels
    }

    pub fn channel(&self, id: ChannelId) -> &SensorChannel {
        &self.channels[id.index()]
    }

    pub fn level(&self, id: ChannelId) -> Option<f64> {
        self.channel(id).value.as_level()
    }

    pub fn movement(&self) -> MovementLevel {
        self.channel(ChannelId::Movement)
            .value
            .as_movement()
            .unwrap_or(MovementLevel::Low)
    }

    pub fn vitals(&self) -> VitalSigns {
        VitalSigns {
            heart_rate: self.level(ChannelId::HeartRate).unwrap_or_default(),
            breathing_rate: self.level(ChannelId::BreathingRate).unwrap_or_default(),
            body_temp: self.level(ChannelId::BodyTemp).unwrap_or_default(),
            movement: self.movement(),
        }
    }

    pub fn warnings(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.channels
            .iter()
            .filter(|c| c.status == ChannelStatus::Warning)
            .map(|c| c.id)
    }
}
