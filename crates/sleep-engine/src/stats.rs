use serde::{Deserialize, Serialize};
use sleep_core::{Recommendation, Session};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub days_monitored: usize,
    /// `None` until at least one session exists.
    pub average_score: Option<u32>,
    pub recommendations_followed: usize,
}

impl UserStats {
    pub fn collect(history: &[Session], recommendations: &[Recommendation]) -> Self {
        let average_score = if history.is_empty() {
            None
        } else {
            let total: u64 = history.iter().map(|s| u64::from(s.score)).sum();
            Some((total as f64 / history.len() as f64).round() as u32)
        };
        Self {
            days_monitored: history.len(),
            average_score,
            recommendations_followed: recommendations.iter().filter(|r| r.completed).count(),
        }
    }
}

/// Headline figures of the most recent session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub score: u32,
    pub duration: String,
    pub efficiency: f64,
    pub deep_sleep: String,
}

impl SessionSummary {
    pub fn of(session: &Session) -> Self {
        Self {
            score: session.score,
            duration: format_hours_minutes(session.duration),
            efficiency: session.efficiency,
            deep_sleep: format_hours_minutes(session.deep_sleep),
        }
    }
}

/// `7.5` -> `"7h 30m"`. Minutes are rounded and carried into the hour.
pub fn format_hours_minutes(hours: f64) -> String {
    let total_minutes = (hours.max(0.0) * 60.0).round() as u64;
    format!("{}h {}m", total_minutes / 60, total_minutes % 60)
}
