//! Volume-button monitor simulator entry point.
//!
//! Wires a [`VolumeButtonMonitor`] to the in-memory `MockPlatform`, then
//! replays a script of button presses, Control Center changes, app switches
//! and interruptions against it on the Tokio runtime.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load settings (TOML, optional)
//!  └─ MockPlatform + LocalNotificationCenter + TokioScheduler
//!  └─ VolumeButtonMonitor::with_callbacks(..)
//!  └─ run_script(..)          -- presses, waits, lifecycle changes
//!  └─ summary                 -- press counts, final volume, HUD count
//! ```
//!
//! Usage:
//! ```bash
//! volume-monitor-sim --script scripts/demo.vms --exact-step
//! RUST_LOG=debug volume-monitor-sim --config settings.toml
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use volume_monitor::infrastructure::{
    notifications::LocalNotificationCenter,
    platform::mock::MockPlatform,
    scheduler::TokioScheduler,
    script::{parse_script, run_script, ScriptTarget, DEMO_SCRIPT},
    storage::config::{load_settings, MonitorSettings},
};
use volume_monitor::{MonitorPlatform, VolumeButtonMonitor, VolumeCallback};

/// Replays volume-button scripts against a simulated device.
#[derive(Debug, Parser)]
#[command(name = "volume-monitor-sim", version, about)]
struct Args {
    /// TOML settings file; defaults apply when omitted or missing.
    #[arg(long, env = "VOLUME_MONITOR_CONFIG")]
    config: Option<PathBuf>,

    /// Script to replay; the built-in demo runs when omitted.
    #[arg(long)]
    script: Option<PathBuf>,

    /// Override `monitor.suppress_native_ui`.
    #[arg(long)]
    suppress_native_ui: Option<bool>,

    /// Enable exact-step mode regardless of the settings file.
    #[arg(long)]
    exact_step: bool,

    /// Device volume before the monitor starts, in `0.0..=1.0`.
    #[arg(long, default_value_t = 0.5, value_parser = parse_volume)]
    initial_volume: f32,
}

fn parse_volume(value: &str) -> Result<f32, String> {
    let volume: f32 = value
        .parse()
        .map_err(|e| format!("`{value}` is not a number: {e}"))?;
    if (0.0..=1.0).contains(&volume) {
        Ok(volume)
    } else {
        Err(format!("`{value}` is outside 0.0..=1.0"))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => load_settings(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => MonitorSettings::default(),
    };

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.logging.log_level)),
        )
        .init();

    let options = settings.to_options().context("invalid monitor settings")?;
    let suppress_native_ui = args
        .suppress_native_ui
        .unwrap_or(settings.monitor.suppress_native_ui);

    let source = match &args.script {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?,
        None => DEMO_SCRIPT.to_string(),
    };
    let commands = parse_script(&source).context("parsing script")?;

    info!("volume monitor simulator starting");

    // ── Platform ──────────────────────────────────────────────────────────────
    let device = Arc::new(MockPlatform::new(args.initial_volume));
    let notifications = Arc::new(LocalNotificationCenter::new());
    let platform = MonitorPlatform {
        session: device.clone(),
        surface: device.clone(),
        notifications: notifications.clone(),
        scheduler: Arc::new(TokioScheduler::current()),
    };

    // ── Callbacks ─────────────────────────────────────────────────────────────
    let ups = Arc::new(AtomicUsize::new(0));
    let downs = Arc::new(AtomicUsize::new(0));
    let on_up: VolumeCallback = {
        let ups = Arc::clone(&ups);
        Arc::new(move || {
            let n = ups.fetch_add(1, Ordering::Relaxed) + 1;
            info!(count = n, "▲ volume up");
        })
    };
    let on_down: VolumeCallback = {
        let downs = Arc::clone(&downs);
        Arc::new(move || {
            let n = downs.fetch_add(1, Ordering::Relaxed) + 1;
            info!(count = n, "▼ volume down");
        })
    };

    let monitor =
        VolumeButtonMonitor::with_callbacks(platform, options, Some(on_up), Some(on_down));
    monitor.set_exact_step_mode(args.exact_step || settings.monitor.exact_step_mode);
    monitor.start(suppress_native_ui);

    // ── Script ────────────────────────────────────────────────────────────────
    let target = ScriptTarget {
        monitor: &monitor,
        device: &device,
        notifications: &notifications,
        suppress_native_ui,
    };
    run_script(&target, &commands).await;

    // Let a pending corrective write land before reporting.
    tokio::time::sleep(options.restore_delay * 2).await;

    info!(
        up = ups.load(Ordering::Relaxed),
        down = downs.load(Ordering::Relaxed),
        device_volume = device.volume(),
        monitor_volume = monitor.current_volume(),
        baseline = monitor.baseline_volume(),
        hud_displays = device.hud_displays(),
        "simulation finished"
    );

    monitor.stop();
    Ok(())
}
