//! volume-monitor library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the simulator binary in `main.rs` share the same module tree.
//!
//! # What does volume-monitor do? (for beginners)
//!
//! Phones do not report volume-button presses directly.  This crate turns
//! output-volume changes into `on_volume_up` / `on_volume_down` callbacks:
//!
//! 1. Activates the audio session in a mixable playback category so the
//!    output volume is observable without silencing other apps.
//! 2. Pins the volume inside `[0.05, 0.95]` so presses are detectable in
//!    both directions.
//! 3. Observes every volume change and classifies it with the rules in
//!    `volume-core` (press, noise, or the echo of its own write).
//! 4. Optionally writes the baseline back through a hidden volume slider,
//!    which keeps the system HUD from appearing and the real volume from
//!    drifting.
//!
//! The platform itself is reached only through the traits in
//! [`application::platform`]; `infrastructure` provides the iOS adapter, an
//! in-memory mock device, a local notification center, and schedulers.

/// Application layer: the monitor and its collaborator traits.
pub mod application;

/// Infrastructure layer: platform adapters, scheduling, settings, scripts.
pub mod infrastructure;

pub use application::monitor::{
    MonitorOptions, MonitorPlatform, VolumeButtonMonitor, VolumeCallback,
};
pub use application::platform::SessionError;
