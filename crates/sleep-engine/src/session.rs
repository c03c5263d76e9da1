//! Idle/Monitoring state machine around the single open session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sleep_core::{RandomSource, RandomSourceError, SamplePoint, Session};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MonitoringState {
    Idle,
    Monitoring,
}

/// Reported outcome of a start/stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Started { session_id: Uuid },
    AlreadyMonitoring,
    Stopped { session_id: Uuid },
    NotMonitoring,
    /// Monitoring was on but no session was open; state drops to idle.
    NoOpenSession,
}

impl Transition {
    /// Guarded no-ops. State was left consistent but the request did nothing useful.
    pub fn is_warning(self) -> bool {
        matches!(
            self,
            Transition::AlreadyMonitoring | Transition::NotMonitoring | Transition::NoOpenSession
        )
    }

    pub fn message(self) -> &'static str {
        match self {
            Transition::Started { .. } => "Sleep monitoring started",
            Transition::AlreadyMonitoring => "Sleep monitoring is already running",
            Transition::Stopped { .. } => "Sleep monitoring finished",
            Transition::NotMonitoring => "No active monitoring",
            Transition::NoOpenSession => "No open session to finish",
        }
    }
}

/// Fills in the simulated quality metrics of a session whose duration is set.
/// Both draws happen before any field is written.
pub fn compute_session_metrics(
    session: &mut Session,
    random: &mut dyn RandomSource,
) -> Result<(), RandomSourceError> {
    let efficiency = random.uniform(80.0, 100.0)?;
    let bonus = random.uniform(0.0, 20.0)?;

    session.efficiency = efficiency;
    session.deep_sleep = session.duration * 0.3;
    session.rem_sleep = session.duration * 0.2;
    session.light_sleep = session.duration * 0.5;
    session.score = (efficiency * 0.8 + bonus).round() as u32;
    Ok(())
}

pub fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    ((end - start).num_milliseconds() as f64 / 3_600_000.0).max(0.0)
}

#[derive(Debug, Clone)]
pub struct SessionManager {
    state: MonitoringState,
    open: Option<Session>,
    /// Most recent first.
    history: Vec<Session>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            state: MonitoringState::Idle,
            open: None,
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> MonitoringState {
        self.state
    }

    pub fn is_monitoring(&self) -> bool {
        self.state == MonitoringState::Monitoring
    }

    pub fn open_session(&self) -> Option<&Session> {
        self.open.as_ref()
    }

    pub fn history(&self) -> &[Session] {
        &self.history
    }

    /// Appends sessions older than everything already in history.
    pub fn extend_history(&mut self, older: impl IntoIterator<Item = Session>) {
        self.history.extend(older);
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Transition {
        if self.is_monitoring() {
            warn!("start requested while already monitoring");
            return Transition::AlreadyMonitoring;
        }

        let session = Session::open(Uuid::new_v4(), now);
        let session_id = session.id;
        self.open = Some(session);
        self.state = MonitoringState::Monitoring;
        info!(%session_id, start = %now, "monitoring session opened");
        Transition::Started { session_id }
    }

    /// Seals the open session. On a random-source failure nothing changes.
    pub fn stop(
        &mut self,
        now: DateTime<Utc>,
        random: &mut dyn RandomSource,
    ) -> Result<Transition, RandomSourceError> {
        if !self.is_monitoring() {
            warn!("stop requested while idle");
            return Ok(Transition::NotMonitoring);
        }

        let Some(mut session) = self.open.take() else {
            warn!("monitoring flag set without an open session");
            self.state = MonitoringState::Idle;
            return Ok(Transition::NoOpenSession);
        };

        session.end_time = Some(now);
        session.duration = hours_between(session.start_time, now);
        if let Err(e) = compute_session_metrics(&mut session, random) {
            session.end_time = None;
            session.duration = 0.0;
            self.open = Some(session);
            return Err(e);
        }

        let session_id = session.id;
        info!(
            %session_id,
            duration_h = session.duration,
            samples = session.metrics.len(),
            efficiency = session.efficiency,
            score = session.score,
            "monitoring session sealed"
        );
        self.history.insert(0, session);
        self.state = MonitoringState::Idle;
        Ok(Transition::Stopped { session_id })
    }

    /// Returns false when no session is open, e.g. for a tick that fired after stop.
    pub fn record_sample(&mut self, sample: SamplePoint) -> bool {
        match self.open.as_mut() {
            Some(session) if self.state == MonitoringState::Monitoring => {
                session.record(sample);
                true
            }
            _ => false,
        }
    }
}
