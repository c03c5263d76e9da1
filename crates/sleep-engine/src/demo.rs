use chrono::{DateTime, Duration, Utc};
use sleep_core::{
    Anomaly, AnomalyKind, Priority, Recommendation, RecommendationCategory, Session, Severity,
};
use uuid::Uuid;

/// Two earlier nights plus the anomaly and advice they produced, used to
/// populate a fresh dashboard.
#[derive(Debug, Clone)]
pub struct DemoHistory {
    /// Most recent first.
    pub sessions: Vec<Session>,
    pub anomalies: Vec<Anomaly>,
    pub recommendations: Vec<Recommendation>,
}

struct PastNight {
    days_ago: i64,
    duration: f64,
    efficiency: f64,
    deep_sleep: f64,
    rem_sleep: f64,
    light_sleep: f64,
    score: u32,
}

const PAST_NIGHTS: [PastNight; 2] = [
    PastNight {
        days_ago: 1,
        duration: 7.5,
        efficiency: 92.0,
        deep_sleep: 2.2,
        rem_sleep: 1.8,
        light_sleep: 3.5,
        score: 85,
    },
    PastNight {
        days_ago: 2,
        duration: 8.1,
        efficiency: 88.0,
        deep_sleep: 2.5,
        rem_sleep: 2.0,
        light_sleep: 3.6,
        score: 78,
    },
];

pub fn demo_history(now: DateTime<Utc>) -> DemoHistory {
    let sessions = PAST_NIGHTS
        .iter()
        .map(|night| {
            let end = now - Duration::days(night.days_ago);
            let start = end - Duration::minutes((night.duration * 60.0).round() as i64);
            Session {
                end_time: Some(end),
                duration: night.duration,
                efficiency: night.efficiency,
                deep_sleep: night.deep_sleep,
                rem_sleep: night.rem_sleep,
                light_sleep: night.light_sleep,
                score: night.score,
                ..Session::open(Uuid::new_v4(), start)
            }
        })
        .collect();

    let anomalies = vec![Anomaly {
        id: 1,
        kind: AnomalyKind::ProlongedAwakening,
        severity: Severity::High,
        message: "Prolonged night-time awakening detected".to_string(),
        timestamp: now - Duration::days(2),
        duration: Some(45),
    }];

    let recommendations = vec![
        Recommendation {
            id: 1,
            category: RecommendationCategory::Environment,
            priority: Priority::High,
            title: "Lower the bedroom temperature".to_string(),
            description: "Your body temperature runs high during sleep".to_string(),
            impact: "+15 score points".to_string(),
            completed: false,
        },
        Recommendation {
            id: 2,
            category: RecommendationCategory::Lifestyle,
            priority: Priority::Medium,
            title: "Avoid screens an hour before bed".to_string(),
            description: "Device use is affecting your sleep quality".to_string(),
            impact: "+8 score points".to_string(),
            completed: false,
        },
    ];

    DemoHistory {
        sessions,
        anomalies,
        recommendations,
    }
}
