//! The single owner of all simulation state.
//!
//! A [`Monitor`] is built from a config, a random source and a scheduler.
//! Callers drive it with [`Monitor::pump`] (or [`Monitor::advance`] on a
//! virtual clock), issue start/stop requests, and read state back through
//! the accessors. Presentation code subscribes with
//! [`Monitor::on_anomaly_raised`] and [`Monitor::on_notification`].

use crate::anomaly::AnomalyDetector;
use crate::classifier::StageClassifier;
use crate::config::MonitorConfig;
use crate::demo::demo_history;
use crate::error::EngineError;
use crate::export::ExportDocument;
use crate::recommendation::RecommendationGenerator;
use crate::scheduler::{Fired, Scheduler, Task, TaskHandle, VirtualScheduler};
use crate::sensor_model::SensorModel;
use crate::session::{MonitoringState, SessionManager, Transition};
use crate::stats::{SessionSummary, UserStats};
use chrono::{DateTime, Duration, Utc};
use sleep_core::{
    Anomaly, ChannelId, IdSequence, Notification, NotificationLevel, RandomSource,
    Recommendation, RecommendationCategory, SamplePoint, SensorSnapshot, Session, VitalSigns,
};
use tracing::{debug, info, trace, warn};

type AnomalyListener = Box<dyn FnMut(&Anomaly)>;
type NotificationListener = Box<dyn FnMut(&Notification)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Only(RecommendationCategory),
}

pub struct Monitor<R, S> {
    config: MonitorConfig,
    random: R,
    scheduler: S,
    sensors: SensorModel,
    classifier: StageClassifier,
    detector: AnomalyDetector,
    recommender: RecommendationGenerator,
    sessions: SessionManager,
    anomalies: Vec<Anomaly>,
    recommendations: Vec<Recommendation>,
    anomaly_ids: IdSequence,
    recommendation_ids: IdSequence,
    link_connected: bool,
    sensor_task: Option<TaskHandle>,
    connection_task: Option<TaskHandle>,
    sample_task: Option<TaskHandle>,
    anomaly_listeners: Vec<AnomalyListener>,
    notification_listeners: Vec<NotificationListener>,
}

impl<R: RandomSource, S: Scheduler> Monitor<R, S> {
    /// Validates the config and schedules the sensor and connection ticks.
    pub fn new(config: MonitorConfig, random: R, mut scheduler: S) -> Result<Self, EngineError> {
        config.validate()?;
        let sensor_task = scheduler.schedule_periodic(config.sensor_interval(), Task::SensorTick)?;
        let connection_task =
            scheduler.schedule_periodic(config.connection_interval(), Task::ConnectionTick)?;

        info!(
            sensor_ms = config.sensor_interval_ms,
            connection_ms = config.connection_interval_ms,
            sample_ms = config.sample_interval_ms,
            "monitor ready"
        );

        Ok(Self {
            sensors: SensorModel::new(&config.initial),
            config,
            random,
            scheduler,
            classifier: StageClassifier,
            detector: AnomalyDetector,
            recommender: RecommendationGenerator::default(),
            sessions: SessionManager::new(),
            anomalies: Vec::new(),
            recommendations: Vec::new(),
            anomaly_ids: IdSequence::new(),
            recommendation_ids: IdSequence::new(),
            link_connected: true,
            sensor_task: Some(sensor_task),
            connection_task: Some(connection_task),
            sample_task: None,
            anomaly_listeners: Vec::new(),
            notification_listeners: Vec::new(),
        })
    }

    pub fn with_recommender(mut self, recommender: RecommendationGenerator) -> Self {
        self.recommender = recommender;
        self
    }

    pub fn start_monitoring(&mut self) -> Result<Transition, EngineError> {
        if self.sessions.is_monitoring() {
            let outcome = self.sessions.start(self.scheduler.now());
            return Ok(self.report(outcome));
        }

        let handle = self
            .scheduler
            .schedule_periodic(self.config.sample_interval(), Task::SampleTick)?;
        self.sample_task = Some(handle);
        let outcome = self.sessions.start(self.scheduler.now());
        Ok(self.report(outcome))
    }

    pub fn stop_monitoring(&mut self) -> Result<Transition, EngineError> {
        let outcome = self.sessions.stop(self.scheduler.now(), &mut self.random)?;
        if !self.sessions.is_monitoring() {
            if let Some(handle) = self.sample_task.take() {
                self.scheduler.cancel(handle);
            }
        }
        if let Transition::Stopped { .. } = outcome {
            self.recommend_for_latest();
        }
        Ok(self.report(outcome))
    }

    pub fn toggle_monitoring(&mut self) -> Result<Transition, EngineError> {
        if self.sessions.is_monitoring() {
            self.stop_monitoring()
        } else {
            self.start_monitoring()
        }
    }

    /// Runs every firing the scheduler reports as due. Returns how many ran.
    pub fn pump(&mut self) -> Result<usize, EngineError> {
        let mut ran = 0;
        while let Some(fired) = self.scheduler.pop_due()? {
            self.dispatch(fired)?;
            ran += 1;
        }
        Ok(ran)
    }

    /// Cancels every periodic task. Monitoring state is left as is.
    pub fn halt(&mut self) {
        for handle in [
            self.sensor_task.take(),
            self.connection_task.take(),
            self.sample_task.take(),
        ]
        .into_iter()
        .flatten()
        {
            self.scheduler.cancel(handle);
        }
        debug!("periodic tasks cancelled");
    }

    pub(crate) fn dispatch(&mut self, fired: Fired) -> Result<(), EngineError> {
        match fired.task {
            Task::SensorTick => self.sensor_tick(),
            Task::ConnectionTick => self.connection_tick(),
            Task::SampleTick => self.sample_tick(fired),
        }
    }

    fn sensor_tick(&mut self) -> Result<(), EngineError> {
        self.sensors.advance(&mut self.random)?;
        if self.sessions.is_monitoring() {
            trace!(
                warnings = self.sensors.snapshot().warnings().count(),
                "live readings refreshed"
            );
        }
        Ok(())
    }

    fn connection_tick(&mut self) -> Result<(), EngineError> {
        let up = self.random.next_unit()? > 1.0 - self.config.link_up_probability;
        if up != self.link_connected {
            info!(link_up = up, "connection status changed");
        }
        self.link_connected = up;
        Ok(())
    }

    fn sample_tick(&mut self, fired: Fired) -> Result<(), EngineError> {
        let current = self.sample_task == Some(fired.handle);
        if !current || !self.sessions.is_monitoring() || self.sessions.open_session().is_none() {
            debug!(at = %fired.at, "stale sample tick ignored");
            if !current || !self.sessions.is_monitoring() {
                self.scheduler.cancel(fired.handle);
                if current {
                    self.sample_task = None;
                }
            }
            return Ok(());
        }

        let snapshot = self.sensors.snapshot();
        let stage = self.classifier.predict_stage(&snapshot, &mut self.random)?;
        let vitals = snapshot.vitals();
        self.sessions.record_sample(SamplePoint {
            timestamp: fired.at,
            vitals,
            stage,
        });

        self.raise_anomalies(&vitals, fired.at, "Alert");
        Ok(())
    }

    /// Runs the detector on the live readings outside the sample cycle.
    /// Works while idle or monitoring; returns how many anomalies were raised.
    pub fn detect_anomalies_now(&mut self) -> usize {
        let vitals = self.sensors.snapshot().vitals();
        let at = self.scheduler.now();
        self.raise_anomalies(&vitals, at, "Anomaly detected")
    }

    fn raise_anomalies(&mut self, vitals: &VitalSigns, at: DateTime<Utc>, prefix: &str) -> usize {
        let found = self.detector.detect(vitals, at, &mut self.anomaly_ids);
        let raised = found.len();
        for anomaly in found {
            warn!(
                id = anomaly.id,
                kind = %anomaly.kind,
                severity = ?anomaly.severity,
                "anomaly detected"
            );
            for listener in self.anomaly_listeners.iter_mut() {
                listener(&anomaly);
            }
            let message = format!("{prefix}: {}", anomaly.message);
            self.anomalies.push(anomaly);
            self.notify(NotificationLevel::Warning, message);
        }
        raised
    }

    fn recommend_for_latest(&mut self) {
        let Some(latest) = self.sessions.history().first() else {
            return;
        };
        let metrics = latest.summary_metrics();
        let fresh = self.recommender.generate(&metrics, &mut self.recommendation_ids);
        for rec in &fresh {
            info!(id = rec.id, title = %rec.title, "recommendation generated");
        }
        self.recommendations.extend(fresh);
    }

    fn report(&mut self, outcome: Transition) -> Transition {
        let level = match outcome {
            Transition::Started { .. } => NotificationLevel::Success,
            Transition::Stopped { .. } => NotificationLevel::Info,
            _ => NotificationLevel::Warning,
        };
        self.notify(level, outcome.message().to_string());
        outcome
    }

    fn notify(&mut self, level: NotificationLevel, message: String) {
        let notification = Notification {
            level,
            message,
            timestamp: self.scheduler.now(),
        };
        for listener in self.notification_listeners.iter_mut() {
            listener(&notification);
        }
    }

    pub fn raise_emergency_alert(&mut self) {
        warn!("emergency alert raised");
        self.notify(
            NotificationLevel::Error,
            "A medical alert was sent. Contact your doctor immediately if needed.".to_string(),
        );
    }

    pub fn on_anomaly_raised(&mut self, listener: impl FnMut(&Anomaly) + 'static) {
        self.anomaly_listeners.push(Box::new(listener));
    }

    pub fn on_notification(&mut self, listener: impl FnMut(&Notification) + 'static) {
        self.notification_listeners.push(Box::new(listener));
    }

    pub fn sensor_snapshot(&self) -> SensorSnapshot {
        self.sensors.snapshot()
    }

    pub fn set_sensor_connected(&mut self, id: ChannelId, connected: bool) {
        info!(channel = %id, connected, "sensor connectivity changed");
        self.sensors.set_connected(id, connected);
    }

    pub fn open_session(&self) -> Option<&Session> {
        self.sessions.open_session()
    }

    /// Sealed sessions, most recent first.
    pub fn session_history(&self) -> &[Session] {
        self.sessions.history()
    }

    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    pub fn recommendations(&self) -> &[Recommendation] {
        &self.recommendations
    }

    pub fn recommendations_by_category(&self, filter: CategoryFilter) -> Vec<&Recommendation> {
        self.recommendations
            .iter()
            .filter(|r| match filter {
                CategoryFilter::All => true,
                CategoryFilter::Only(category) => r.category == category,
            })
            .collect()
    }

    /// Returns false for an unknown id.
    pub fn set_recommendation_completed(&mut self, id: u64, completed: bool) -> bool {
        match self.recommendations.iter_mut().find(|r| r.id == id) {
            Some(rec) => {
                rec.completed = completed;
                true
            }
            None => false,
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.sessions.is_monitoring()
    }

    pub fn state(&self) -> MonitoringState {
        self.sessions.state()
    }

    pub fn link_connected(&self) -> bool {
        self.link_connected
    }

    pub fn user_stats(&self) -> UserStats {
        UserStats::collect(self.sessions.history(), &self.recommendations)
    }

    pub fn latest_summary(&self) -> Option<SessionSummary> {
        self.sessions.history().first().map(SessionSummary::of)
    }

    pub fn export(&self) -> ExportDocument {
        ExportDocument {
            sessions: self.sessions.history().to_vec(),
            anomalies: self.anomalies.clone(),
            recommendations: self.recommendations.clone(),
            export_date: self.scheduler.now(),
        }
    }

    /// Same document as [`Monitor::export`], announced with a success notification.
    pub fn export_with_notice(&mut self) -> ExportDocument {
        let doc = self.export();
        info!(file = %doc.file_name(), sessions = doc.sessions.len(), "data exported");
        self.notify(
            NotificationLevel::Success,
            "Data exported successfully".to_string(),
        );
        doc
    }

    /// Loads two earlier nights with their anomaly and advice behind any
    /// existing history. Ids are reassigned from this monitor's sequences.
    pub fn seed_demo_history(&mut self) {
        let demo = demo_history(self.scheduler.now());
        self.sessions.extend_history(demo.sessions);
        for mut anomaly in demo.anomalies {
            anomaly.id = self.anomaly_ids.next_id();
            self.anomalies.push(anomaly);
        }
        for mut rec in demo.recommendations {
            rec.id = self.recommendation_ids.next_id();
            self.recommendations.push(rec);
        }
        info!(
            sessions = self.sessions.history().len(),
            "demo history loaded"
        );
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }
}

impl<R: RandomSource> Monitor<R, VirtualScheduler> {
    /// Moves the virtual clock forward and runs everything that fell due.
    pub fn advance(&mut self, by: Duration) -> Result<usize, EngineError> {
        self.scheduler.advance(by);
        self.pump()
    }
}
