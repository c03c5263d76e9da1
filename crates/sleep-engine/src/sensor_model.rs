//! Bounded random walk over the six simulated channels.

use crate::config::InitialReadings;
use sleep_core::{
    weighted_choice, ChannelId, ChannelStatus, ChannelValue, MovementLevel, RandomSource,
    RandomSourceError, SensorChannel, SensorSnapshot,
};

/// Movement is re-drawn every tick rather than walked.
pub const MOVEMENT_WEIGHTS: [(MovementLevel, f64); 3] = [
    (MovementLevel::Low, 0.7),
    (MovementLevel::Medium, 0.2),
    (MovementLevel::High, 0.1),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WarnWhen {
    Above(f64),
    Below(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRule {
    pub min: f64,
    pub max: f64,
    pub half_step: f64,
    pub warn: WarnWhen,
}

impl NumericRule {
    pub fn step(&self, value: f64, delta: f64) -> f64 {
        (value + delta).clamp(self.min, self.max)
    }

    pub fn status(&self, value: f64) -> ChannelStatus {
        let warning = match self.warn {
            WarnWhen::Above(limit) => value > limit,
            WarnWhen::Below(limit) => value < limit,
        };
        if warning {
            ChannelStatus::Warning
        } else {
            ChannelStatus::Normal
        }
    }
}

/// Clamp range, step half-width and warning threshold of a numeric channel.
pub fn numeric_rule(id: ChannelId) -> Option<NumericRule> {
    let rule = match id {
        ChannelId::HeartRate => NumericRule {
            min: 60.0,
            max: 100.0,
            half_step: 2.0,
            warn: WarnWhen::Above(90.0),
        },
        ChannelId::BreathingRate => NumericRule {
            min: 12.0,
            max: 20.0,
            half_step: 1.0,
            warn: WarnWhen::Above(18.0),
        },
        ChannelId::BodyTemp => NumericRule {
            min: 36.0,
            max: 37.0,
            half_step: 0.1,
            warn: WarnWhen::Above(36.8),
        },
        ChannelId::Oxygen => NumericRule {
            min: 95.0,
            max: 100.0,
            half_step: 1.0,
            warn: WarnWhen::Below(97.0),
        },
        ChannelId::Noise => NumericRule {
            min: 20.0,
            max: 60.0,
            half_step: 5.0,
            warn: WarnWhen::Above(50.0),
        },
        ChannelId::Movement => return None,
    };
    Some(rule)
}

pub fn movement_status(level: MovementLevel) -> ChannelStatus {
    if level == MovementLevel::High {
        ChannelStatus::Warning
    } else {
        ChannelStatus::Normal
    }
}

#[derive(Debug, Clone)]
pub struct SensorModel {
    current: SensorSnapshot,
}

impl SensorModel {
    pub fn new(initial: &InitialReadings) -> Self {
        let current = SensorSnapshot::from_fn(|id| match (numeric_rule(id), initial.level(id)) {
            (Some(rule), Some(level)) => {
                let level = level.clamp(rule.min, rule.max);
                (ChannelValue::Level(level), rule.status(level))
            }
            _ => (
                ChannelValue::Movement(initial.movement),
                movement_status(initial.movement),
            ),
        });
        Self { current }
    }

    /// One tick: every connected channel takes a step and recomputes status.
    /// A failed draw stops the tick; channels already stepped keep their value.
    pub fn advance(&mut self, random: &mut dyn RandomSource) -> Result<(), RandomSourceError> {
        for id in ChannelId::ALL {
            let channel = self.current.channel(id);
            if !channel.connected {
                continue;
            }
            let (value, status) = match numeric_rule(id) {
                Some(rule) => {
                    let current = channel.value.as_level().unwrap_or(rule.min);
                    let next = rule.step(current, random.centered(rule.half_step)?);
                    (ChannelValue::Level(next), rule.status(next))
                }
                None => {
                    let level = weighted_choice(random, &MOVEMENT_WEIGHTS)?;
                    (ChannelValue::Movement(level), movement_status(level))
                }
            };
            self.current.set_reading(id, value, status);
        }
        Ok(())
    }

    pub fn set_connected(&mut self, id: ChannelId, connected: bool) {
        self.current.set_connected(id, connected);
    }

    pub fn channel(&self, id: ChannelId) -> &SensorChannel {
        self.current.channel(id)
    }

    pub fn snapshot(&self) -> SensorSnapshot {
        self.current.clone()
    }
}
