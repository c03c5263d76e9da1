//! `sleepsync`: drives one simulated night and writes the JSON export.
//!
//! By default the night runs on a virtual clock and finishes instantly.
//! `--realtime` runs it against the wall clock until the night elapses or
//! ctrl-c is pressed.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use clap::Parser;
use prometheus_bridge::MonitorMetrics;
use sleep_core::{NotificationLevel, RngSource};
use sleep_engine::{format_hours_minutes, Monitor, MonitorConfig, Scheduler, VirtualScheduler, WallScheduler};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "sleepsync", version, about = "Simulated sleep monitoring night")]
struct Args {
    /// JSON config with intervals, link probability and initial readings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Length of the monitored night.
    #[arg(long, default_value_t = 8.0)]
    hours: f64,

    /// Seed for reproducible readings. Entropy is used when absent.
    #[arg(long)]
    seed: Option<u64>,

    /// Directory the export document is written to.
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Load two earlier nights before monitoring starts.
    #[arg(long)]
    demo_history: bool,

    #[arg(long)]
    realtime: bool,

    /// Print Prometheus metrics after the night.
    #[arg(long)]
    metrics: bool,

    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn night_length(hours: f64) -> Result<Duration> {
    if !hours.is_finite() || hours <= 0.0 || hours > 24.0 {
        bail!("--hours must be within (0, 24], got {hours}");
    }
    Ok(Duration::milliseconds((hours * 3_600_000.0).round() as i64))
}

fn attach_listeners<S: Scheduler>(monitor: &mut Monitor<RngSource, S>) {
    monitor.on_notification(|n| match n.level {
        NotificationLevel::Success | NotificationLevel::Info => info!("{}", n.message),
        NotificationLevel::Warning => warn!("{}", n.message),
        NotificationLevel::Error => error!("{}", n.message),
    });
    monitor.on_anomaly_raised(|a| debug!(id = a.id, kind = %a.kind, at = %a.timestamp, "anomaly raised"));
}

fn prepare<S: Scheduler>(
    config: MonitorConfig,
    random: RngSource,
    scheduler: S,
    demo_history: bool,
) -> Result<Monitor<RngSource, S>> {
    let mut monitor = Monitor::new(config, random, scheduler).context("building monitor")?;
    attach_listeners(&mut monitor);
    if demo_history {
        monitor.seed_demo_history();
    }
    monitor.start_monitoring()?;
    Ok(monitor)
}

fn run_virtual(
    config: MonitorConfig,
    random: RngSource,
    night: Duration,
    demo_history: bool,
) -> Result<Monitor<RngSource, VirtualScheduler>> {
    let scheduler = VirtualScheduler::starting_at(Utc::now());
    let mut monitor = prepare(config, random, scheduler, demo_history)?;
    let fired = monitor.advance(night)?;
    debug!(fired, "virtual night complete");
    monitor.stop_monitoring()?;
    Ok(monitor)
}

async fn run_realtime(
    config: MonitorConfig,
    random: RngSource,
    night: Duration,
    demo_history: bool,
) -> Result<Monitor<RngSource, WallScheduler>> {
    let mut monitor = prepare(config, random, WallScheduler::new(), demo_history)?;

    let deadline = tokio::time::sleep(night.to_std().context("night length")?);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(deadline, ctrl_c);
    let mut poll = tokio::time::interval(std::time::Duration::from_millis(250));

    loop {
        tokio::select! {
            _ = poll.tick() => {
                monitor.pump()?;
            }
            _ = &mut deadline => {
                info!("night elapsed");
                break;
            }
            res = &mut ctrl_c => {
                res.context("waiting for ctrl-c")?;
                info!("interrupted, finishing session");
                break;
            }
        }
    }

    monitor.pump()?;
    monitor.stop_monitoring()?;
    Ok(monitor)
}

fn finish<S: Scheduler>(monitor: &mut Monitor<RngSource, S>, args: &Args) -> Result<()> {
    let doc = monitor.export_with_notice();
    fs::create_dir_all(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;
    let path = args.out.join(doc.file_name());
    fs::write(&path, doc.to_json_pretty()?)
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), sessions = doc.sessions.len(), "export written");

    if let Some(summary) = monitor.latest_summary() {
        println!(
            "score {}  slept {}  efficiency {:.0}%  deep {}",
            summary.score, summary.duration, summary.efficiency, summary.deep_sleep
        );
    }
    if let Some(open) = monitor.open_session() {
        warn!(samples = open.metrics.len(), "session left open");
    }

    let stats = monitor.user_stats();
    println!(
        "nights {}  average score {}  anomalies {}  advice followed {}",
        stats.days_monitored,
        stats
            .average_score
            .map_or_else(|| "-".to_string(), |s| s.to_string()),
        monitor.anomalies().len(),
        stats.recommendations_followed
    );
    for rec in monitor.recommendations() {
        println!("[{:?}] {}: {} ({})", rec.priority, rec.title, rec.description, rec.impact);
    }

    if args.metrics {
        let metrics = MonitorMetrics::new()?;
        metrics.observe(&*monitor);
        print!("{}", metrics.render()?);
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let config = match &args.config {
        Some(path) => MonitorConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => MonitorConfig::default(),
    };
    let night = night_length(args.hours)?;
    let random = match args.seed {
        Some(seed) => RngSource::seeded(seed),
        None => RngSource::from_entropy(),
    };
    info!(
        hours = args.hours,
        seed = ?args.seed,
        realtime = args.realtime,
        night = %format_hours_minutes(args.hours),
        "starting night"
    );

    if args.realtime {
        let mut monitor = run_realtime(config, random, night, args.demo_history).await?;
        finish(&mut monitor, &args)
    } else {
        let mut monitor = run_virtual(config, random, night, args.demo_history)?;
        finish(&mut monitor, &args)
    }
}
