use crate::recommendation::RecommendationRule;
use crate::{
    CategoryFilter, EngineError, ExportDocument, Fired, Monitor, MonitorConfig,
    MonitoringState, RecommendationGenerator, Scheduler, SchedulerError, Task, TaskHandle,
    Transition, VirtualScheduler,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use sleep_core::{
    AnomalyKind, ChannelId, ChannelStatus, Notification, NotificationLevel, Priority, RandomSourceError,
    RecommendationCategory, SequenceSource, SleepStage,
};
use std::cell::RefCell;
use std::rc::Rc;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 22, 0, 0).unwrap()
}

/// A constant draw of 0.5 keeps every numeric channel still and movement low.
fn calm_monitor() -> Monitor<SequenceSource, VirtualScheduler> {
    monitor_with(SequenceSource::constant(0.5))
}

fn monitor_with(random: SequenceSource) -> Monitor<SequenceSource, VirtualScheduler> {
    Monitor::new(
        MonitorConfig::default(),
        random,
        VirtualScheduler::starting_at(t0()),
    )
    .unwrap()
}

fn capture_notifications<S: Scheduler>(
    monitor: &mut Monitor<SequenceSource, S>,
) -> Rc<RefCell<Vec<Notification>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    monitor.on_notification(move |n| sink.borrow_mut().push(n.clone()));
    seen
}

#[test]
fn immediate_stop_seals_an_empty_session() {
    let mut monitor = calm_monitor();
    let notes = capture_notifications(&mut monitor);

    let started = monitor.start_monitoring().unwrap();
    assert!(matches!(started, Transition::Started { .. }));
    assert!(monitor.is_monitoring());
    assert_eq!(monitor.open_session().map(|s| s.start_time), Some(t0()));

    let stopped = monitor.stop_monitoring().unwrap();
    assert!(matches!(stopped, Transition::Stopped { .. }));
    assert_eq!(monitor.state(), MonitoringState::Idle);
    assert!(monitor.open_session().is_none());

    let history = monitor.session_history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].duration, 0.0);
    assert_eq!(history[0].staged_hours(), 0.0);
    assert_eq!(history[0].efficiency, 90.0);
    assert_eq!(history[0].score, 82);
    assert!(history[0].metrics.is_empty());

    let levels: Vec<_> = notes.borrow().iter().map(|n| n.level).collect();
    assert_eq!(levels, vec![NotificationLevel::Success, NotificationLevel::Info]);
}

#[test]
fn stop_without_start_is_a_warning() {
    let mut monitor = calm_monitor();
    let notes = capture_notifications(&mut monitor);

    let outcome = monitor.stop_monitoring().unwrap();
    assert_eq!(outcome, Transition::NotMonitoring);
    assert!(outcome.is_warning());
    assert!(monitor.session_history().is_empty());

    let notes = notes.borrow();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, NotificationLevel::Warning);
    assert_eq!(notes[0].message, "No active monitoring");
}

#[test]
fn second_start_keeps_the_open_session() {
    let mut monitor = calm_monitor();
    monitor.start_monitoring().unwrap();
    let open_id = monitor.open_session().map(|s| s.id);

    monitor.advance(Duration::minutes(1)).unwrap();
    assert_eq!(monitor.start_monitoring().unwrap(), Transition::AlreadyMonitoring);
    assert_eq!(monitor.open_session().map(|s| s.id), open_id);

    // Still exactly one sample task: two samples in the first minute.
    assert_eq!(monitor.open_session().map(|s| s.metrics.len()), Some(2));
    monitor.advance(Duration::minutes(1)).unwrap();
    assert_eq!(monitor.open_session().map(|s| s.metrics.len()), Some(4));
}

#[test]
fn sample_ticks_record_points_while_monitoring() {
    let mut monitor = calm_monitor();
    monitor.start_monitoring().unwrap();
    monitor.advance(Duration::minutes(2)).unwrap();

    let session = monitor.open_session().unwrap();
    assert_eq!(session.metrics.len(), 4);
    assert_eq!(session.stages, vec![SleepStage::Light; 4]);
    assert_eq!(session.metrics[0].timestamp, t0() + Duration::seconds(30));
    assert_eq!(session.metrics[3].timestamp, t0() + Duration::minutes(2));
    assert_eq!(session.metrics[0].vitals.heart_rate, 72.0);

    monitor.stop_monitoring().unwrap();
    monitor.advance(Duration::minutes(5)).unwrap();
    assert_eq!(monitor.session_history()[0].metrics.len(), 4);
    assert!(monitor.open_session().is_none());

    let sealed = &monitor.session_history()[0];
    assert!((sealed.duration - 2.0 / 60.0).abs() < 1e-12);
    assert!((sealed.staged_hours() - sealed.duration).abs() < 1e-9);
}

#[test]
fn anomalies_reach_listeners_and_notifications() {
    // 0.95 pushes every channel up and draws high movement.
    let mut monitor = monitor_with(SequenceSource::constant(0.95));
    let raised = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&raised);
    monitor.on_anomaly_raised(move |a| sink.borrow_mut().push(a.kind));
    let notes = capture_notifications(&mut monitor);

    monitor.start_monitoring().unwrap();
    monitor.advance(Duration::seconds(30)).unwrap();

    assert_eq!(*raised.borrow(), vec![AnomalyKind::ExcessiveMovement]);
    assert_eq!(monitor.anomalies().len(), 1);
    assert_eq!(monitor.anomalies()[0].id, 1);
    assert_eq!(monitor.anomalies()[0].timestamp, t0() + Duration::seconds(30));

    let last = notes.borrow().last().cloned().unwrap();
    assert_eq!(last.level, NotificationLevel::Warning);
    assert_eq!(last.message, "Alert: Excessive movement during sleep");

    let snapshot = monitor.sensor_snapshot();
    // Elevated enough to warn, never above the alert limit.
    assert_eq!(snapshot.channel(ChannelId::HeartRate).status, ChannelStatus::Warning);
    assert!(snapshot.level(ChannelId::HeartRate).unwrap() <= 100.0);
    assert_eq!(monitor.open_session().map(|s| s.stages.clone()), Some(vec![SleepStage::Rem]));
}

#[test]
fn no_anomalies_are_collected_while_idle() {
    let mut monitor = monitor_with(SequenceSource::constant(0.95));
    monitor.advance(Duration::minutes(10)).unwrap();
    assert!(monitor.anomalies().is_empty());
    assert_eq!(monitor.sensor_snapshot().level(ChannelId::Oxygen), Some(100.0));
}

#[test]
fn disconnected_sensor_keeps_its_value() {
    let mut monitor = monitor_with(SequenceSource::constant(0.95));
    monitor.set_sensor_connected(ChannelId::HeartRate, false);
    monitor.advance(Duration::seconds(10)).unwrap();

    let snapshot = monitor.sensor_snapshot();
    assert!(!snapshot.channel(ChannelId::HeartRate).connected);
    assert_eq!(snapshot.level(ChannelId::HeartRate), Some(72.0));
    assert_eq!(snapshot.level(ChannelId::BreathingRate), Some(20.0));
}

#[test]
fn connection_tick_follows_link_probability() {
    let mut monitor = monitor_with(SequenceSource::constant(0.05));
    assert!(monitor.link_connected());
    monitor.advance(Duration::seconds(5)).unwrap();
    assert!(!monitor.link_connected());

    let mut monitor = monitor_with(SequenceSource::constant(0.5));
    monitor.advance(Duration::seconds(5)).unwrap();
    assert!(monitor.link_connected());
}

#[test]
fn exhausted_random_source_propagates() {
    let mut monitor = monitor_with(SequenceSource::new([0.0_f64; 0]));
    let err = monitor.advance(Duration::seconds(2)).unwrap_err();
    assert!(matches!(
        err,
        EngineError::RandomSource(RandomSourceError::Exhausted)
    ));
}

#[test]
fn failed_seal_keeps_monitoring() {
    let mut monitor = monitor_with(SequenceSource::new([0.3]));
    monitor.start_monitoring().unwrap();
    let err = monitor.stop_monitoring().unwrap_err();
    assert!(matches!(err, EngineError::RandomSource(_)));
    assert!(monitor.is_monitoring());
    assert!(monitor.open_session().is_some());
    assert!(monitor.session_history().is_empty());
}

/// Accepts tasks but its clock always fails.
struct BrokenClock;

impl Scheduler for BrokenClock {
    fn now(&self) -> DateTime<Utc> {
        t0()
    }

    fn schedule_periodic(
        &mut self,
        _every: Duration,
        _task: Task,
    ) -> Result<TaskHandle, SchedulerError> {
        VirtualScheduler::starting_at(t0()).schedule_periodic(Duration::seconds(1), Task::SensorTick)
    }

    fn cancel(&mut self, _handle: TaskHandle) -> bool {
        false
    }

    fn is_scheduled(&self, _handle: TaskHandle) -> bool {
        false
    }

    fn pop_due(&mut self) -> Result<Option<Fired>, SchedulerError> {
        Err(SchedulerError::Clock("timer source unavailable".to_string()))
    }
}

#[test]
fn scheduler_failure_propagates() {
    let mut monitor =
        Monitor::new(MonitorConfig::default(), SequenceSource::constant(0.5), BrokenClock).unwrap();
    let err = monitor.pump().unwrap_err();
    assert!(matches!(err, EngineError::Scheduler(SchedulerError::Clock(_))));
}

#[test]
fn invalid_config_is_rejected_before_scheduling() {
    let config = MonitorConfig {
        sample_interval_ms: 0,
        ..MonitorConfig::default()
    };
    let result = Monitor::new(
        config,
        SequenceSource::constant(0.5),
        VirtualScheduler::starting_at(t0()),
    );
    assert!(matches!(result, Err(EngineError::Config(_))));
}

#[test]
fn toggle_alternates_start_and_stop() {
    let mut monitor = calm_monitor();
    assert!(matches!(monitor.toggle_monitoring().unwrap(), Transition::Started { .. }));
    monitor.advance(Duration::hours(1)).unwrap();
    assert!(matches!(monitor.toggle_monitoring().unwrap(), Transition::Stopped { .. }));
    assert_eq!(monitor.session_history().len(), 1);
    assert!((monitor.session_history()[0].duration - 1.0).abs() < 1e-12);
}

#[test]
fn seal_runs_recommendation_rules() {
    let always = RecommendationRule {
        applies: |_| true,
        category: RecommendationCategory::Lifestyle,
        priority: Priority::Low,
        title: "Keep a regular bedtime",
        description: "Go to bed at the same time every night",
        impact: "+5 score points",
    };
    let mut monitor = calm_monitor().with_recommender(RecommendationGenerator::with_rules(vec![
        RecommendationRule::low_efficiency(),
        always,
    ]));

    monitor.start_monitoring().unwrap();
    monitor.stop_monitoring().unwrap();

    // Simulated efficiency is 90, so only the unconditional rule fires.
    let recs = monitor.recommendations();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].id, 1);
    assert_eq!(recs[0].title, "Keep a regular bedtime");
}

#[test]
fn export_of_two_sessions_round_trips() {
    let mut monitor = calm_monitor();
    for _ in 0..2 {
        monitor.start_monitoring().unwrap();
        monitor.advance(Duration::minutes(45)).unwrap();
        monitor.stop_monitoring().unwrap();
        monitor.advance(Duration::hours(20)).unwrap();
    }

    let doc = monitor.export();
    assert_eq!(doc.sessions.len(), 2);
    assert!(doc.anomalies.is_empty());
    assert_eq!(doc.export_date, t0() + Duration::minutes(90) + Duration::hours(40));
    assert_eq!(doc.file_name(), "sleepsync-data-2026-03-03.json");

    let json = doc.to_json_pretty().unwrap();
    assert!(json.contains("\"exportDate\""));
    assert!(json.contains("\"startTime\""));
    assert!(json.contains("\"heartRate\""));
    assert_eq!(ExportDocument::from_json(&json).unwrap(), doc);
}

#[test]
fn demo_history_feeds_stats_and_summary() {
    let mut monitor = calm_monitor();
    monitor.seed_demo_history();

    let stats = monitor.user_stats();
    assert_eq!(stats.days_monitored, 2);
    assert_eq!(stats.average_score, Some(82));
    assert_eq!(stats.recommendations_followed, 0);

    let summary = monitor.latest_summary().unwrap();
    assert_eq!(summary.score, 85);
    assert_eq!(summary.duration, "7h 30m");
    assert_eq!(summary.deep_sleep, "2h 12m");

    assert_eq!(monitor.anomalies().len(), 1);
    assert_eq!(monitor.anomalies()[0].kind, AnomalyKind::ProlongedAwakening);
    assert_eq!(monitor.anomalies()[0].duration, Some(45));

    assert!(monitor.set_recommendation_completed(1, true));
    assert!(!monitor.set_recommendation_completed(99, true));
    assert_eq!(monitor.user_stats().recommendations_followed, 1);
}

#[test]
fn empty_history_has_no_average() {
    let monitor = calm_monitor();
    assert_eq!(monitor.user_stats().average_score, None);
    assert!(monitor.latest_summary().is_none());
}

#[test]
fn category_filter_selects_recommendations() {
    let mut monitor = calm_monitor();
    monitor.seed_demo_history();

    assert_eq!(monitor.recommendations_by_category(CategoryFilter::All).len(), 2);
    let lifestyle =
        monitor.recommendations_by_category(CategoryFilter::Only(RecommendationCategory::Lifestyle));
    assert_eq!(lifestyle.len(), 1);
    assert_eq!(lifestyle[0].priority, Priority::Medium);
}

#[test]
fn emergency_alert_is_an_error_notification() {
    let mut monitor = calm_monitor();
    let notes = capture_notifications(&mut monitor);
    monitor.raise_emergency_alert();
    assert_eq!(notes.borrow()[0].level, NotificationLevel::Error);
}

#[test]
fn halt_stops_every_tick() {
    let mut monitor = calm_monitor();
    monitor.start_monitoring().unwrap();
    monitor.halt();
    assert_eq!(monitor.advance(Duration::hours(1)).unwrap(), 0);
    assert_eq!(monitor.open_session().map(|s| s.metrics.len()), Some(0));
}

#[test]
fn ad_hoc_detection_while_idle_feeds_the_shared_list() {
    // 0.95 draws high movement on every sensor tick.
    let mut monitor = monitor_with(SequenceSource::constant(0.95));
    let raised = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&raised);
    monitor.on_anomaly_raised(move |a| sink.borrow_mut().push(a.id));
    let notes = capture_notifications(&mut monitor);

    monitor.advance(Duration::seconds(2)).unwrap();
    assert!(!monitor.is_monitoring());
    assert!(monitor.anomalies().is_empty());

    assert_eq!(monitor.detect_anomalies_now(), 1);
    assert_eq!(monitor.anomalies().len(), 1);
    assert_eq!(monitor.anomalies()[0].kind, AnomalyKind::ExcessiveMovement);
    assert_eq!(monitor.anomalies()[0].timestamp, t0() + Duration::seconds(2));
    assert_eq!(*raised.borrow(), vec![1]);

    let notes = notes.borrow();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, NotificationLevel::Warning);
    assert_eq!(notes[0].message, "Anomaly detected: Excessive movement during sleep");
}

#[test]
fn ad_hoc_detection_shares_ids_with_sample_ticks() {
    let mut monitor = monitor_with(SequenceSource::constant(0.95));
    monitor.start_monitoring().unwrap();
    monitor.advance(Duration::seconds(30)).unwrap();
    monitor.detect_anomalies_now();

    let ids: Vec<u64> = monitor.anomalies().iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn calm_readings_raise_nothing_ad_hoc() {
    let mut monitor = calm_monitor();
    monitor.advance(Duration::seconds(10)).unwrap();
    assert_eq!(monitor.detect_anomalies_now(), 0);
    assert!(monitor.anomalies().is_empty());
}

#[test]
fn export_with_notice_announces_success() {
    let mut monitor = calm_monitor();
    monitor.seed_demo_history();
    let notes = capture_notifications(&mut monitor);

    let doc = monitor.export_with_notice();
    assert_eq!(doc, monitor.export());

    let notes = notes.borrow();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, NotificationLevel::Success);
    assert_eq!(notes[0].message, "Data exported successfully");
}

#[test]
fn heart_rate_clamped_at_top_is_not_an_anomaly() {
    let mut config = MonitorConfig::default();
    config.initial.heart_rate = 99.5;
    let mut monitor = Monitor::new(
        config,
        SequenceSource::constant(0.999_999),
        VirtualScheduler::starting_at(t0()),
    )
    .unwrap();

    monitor.start_monitoring().unwrap();
    monitor.advance(Duration::seconds(30)).unwrap();

    assert_eq!(monitor.sensor_snapshot().level(ChannelId::HeartRate), Some(100.0));
    let kinds: Vec<_> = monitor.anomalies().iter().map(|a| a.kind).collect();
    assert_eq!(kinds, vec![AnomalyKind::ExcessiveMovement]);
}
