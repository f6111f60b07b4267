//! Mock device for unit testing and simulation.
//!
//! # Why a mock device?
//!
//! The real adapters talk to `AVAudioSession` and `MPVolumeView`, which:
//!
//! - Only exist on a phone or simulator.
//! - Change the real output volume of the machine running the tests.
//! - Cannot be driven from Rust test code (nobody presses the buttons).
//!
//! `MockPlatform` replaces all of that with an in-memory device.  It
//! implements [`AudioSession`] and [`VolumeSurface`], lets tests press the
//! hardware buttons or drag a Control Center slider, and records every write
//! the monitor makes.
//!
//! # Delivery semantics
//!
//! Like platform key-value observing, observers are called synchronously on
//! the thread that changed the volume, including changes made through
//! [`VolumeSurface::set_volume`].  Observer registration delivers one seed
//! change with `old == new`.
//!
//! # Usage in tests
//!
//! ```ignore
//! let device = Arc::new(MockPlatform::new(0.5));
//! // ... build a monitor on `device` and start it ...
//! device.press_volume_up();
//! assert_eq!(device.volume(), 0.5625);
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::trace;
use uuid::Uuid;
use volume_core::{VolumeChange, CANONICAL_STEP};

use crate::application::platform::{
    AudioSession, ObserverToken, SessionError, VolumeHandler, VolumeSurface,
};

/// Volume change produced by one simulated hardware press.
pub const HARDWARE_STEP: f32 = CANONICAL_STEP;

#[derive(Default)]
struct DeviceState {
    volume: f32,
    observers: Vec<(ObserverToken, VolumeHandler)>,
    category_set: bool,
    session_active: bool,
    activation_attempts: u32,
    fail_activation: bool,
    fail_category: bool,
    surface_attached: bool,
    surface_hidden: bool,
    surface_writes: Vec<f32>,
    hud_displays: u32,
}

/// Clamps into `0.0..=1.0`; a non-finite value reads as silence.
fn clamp_volume(volume: f32) -> f32 {
    if volume.is_finite() {
        volume.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// An in-memory phone: output volume, audio session, and volume surface.
pub struct MockPlatform {
    device: Mutex<DeviceState>,
}

impl MockPlatform {
    /// Creates a device at `initial_volume` (clamped to `0.0..=1.0`).
    pub fn new(initial_volume: f32) -> Self {
        Self {
            device: Mutex::new(DeviceState {
                volume: clamp_volume(initial_volume),
                surface_hidden: true,
                ..DeviceState::default()
            }),
        }
    }

    fn device(&self) -> MutexGuard<'_, DeviceState> {
        self.device.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Simulated user actions ────────────────────────────────────────────────

    /// Presses the hardware volume-up button.  Returns the new volume.
    pub fn press_volume_up(&self) -> f32 {
        self.press(HARDWARE_STEP)
    }

    /// Presses the hardware volume-down button.  Returns the new volume.
    pub fn press_volume_down(&self) -> f32 {
        self.press(-HARDWARE_STEP)
    }

    fn press(&self, step: f32) -> f32 {
        let target = {
            let mut device = self.device();
            if !device.surface_attached || device.surface_hidden {
                device.hud_displays += 1;
            }
            device.volume + step
        };
        self.change_volume(target)
    }

    /// Sets the volume from outside the app (Control Center, lock screen,
    /// a Bluetooth accessory).  Returns the new volume.
    pub fn set_system_volume(&self, volume: f32) -> f32 {
        self.change_volume(volume)
    }

    /// Applies a volume change and notifies observers outside the lock.
    fn change_volume(&self, target: f32) -> f32 {
        let (change, observers) = {
            let mut device = self.device();
            let old = device.volume;
            let new = clamp_volume(target);
            device.volume = new;
            let observers: Vec<VolumeHandler> =
                device.observers.iter().map(|(_, h)| h.clone()).collect();
            (VolumeChange::new(old, new), observers)
        };

        // The platform only reports actual changes.
        if change.is_seed() {
            return change.new;
        }
        trace!(
            old = change.old,
            new = change.new,
            observers = observers.len(),
            "device volume changed"
        );
        for handler in observers {
            handler(change);
        }
        change.new
    }

    // ── Fault injection ───────────────────────────────────────────────────────

    /// Makes every subsequent `set_active` call fail.
    pub fn set_fail_activation(&self, fail: bool) {
        self.device().fail_activation = fail;
    }

    /// Makes every subsequent category change fail.
    pub fn set_fail_category(&self, fail: bool) {
        self.device().fail_category = fail;
    }

    /// Simulates the system deactivating the session (e.g. a phone call).
    pub fn deactivate_session(&self) {
        self.device().session_active = false;
    }

    // ── Inspection ────────────────────────────────────────────────────────────

    pub fn volume(&self) -> f32 {
        self.device().volume
    }

    pub fn observer_count(&self) -> usize {
        self.device().observers.len()
    }

    pub fn is_session_active(&self) -> bool {
        self.device().session_active
    }

    pub fn is_category_set(&self) -> bool {
        self.device().category_set
    }

    pub fn activation_attempts(&self) -> u32 {
        self.device().activation_attempts
    }

    pub fn is_surface_attached(&self) -> bool {
        self.device().surface_attached
    }

    pub fn is_surface_hidden(&self) -> bool {
        self.device().surface_hidden
    }

    /// Every volume written through the surface, in order.
    pub fn surface_writes(&self) -> Vec<f32> {
        self.device().surface_writes.clone()
    }

    /// Number of presses that would have shown the system volume HUD.
    pub fn hud_displays(&self) -> u32 {
        self.device().hud_displays
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl AudioSession for MockPlatform {
    fn set_playback_mixable_category(&self) -> Result<(), SessionError> {
        let mut device = self.device();
        if device.fail_category {
            return Err(SessionError::Category("mock failure".into()));
        }
        device.category_set = true;
        Ok(())
    }

    fn set_active(&self, active: bool) -> Result<(), SessionError> {
        let mut device = self.device();
        device.activation_attempts += 1;
        if device.fail_activation {
            return Err(SessionError::Activation("mock failure".into()));
        }
        device.session_active = active;
        Ok(())
    }

    fn output_volume(&self) -> f32 {
        self.device().volume
    }

    fn observe_output_volume(&self, handler: VolumeHandler) -> ObserverToken {
        let token = Uuid::new_v4();
        let current = {
            let mut device = self.device();
            device.observers.push((token, handler.clone()));
            device.volume
        };
        handler(VolumeChange::seed(current));
        token
    }

    fn remove_volume_observer(&self, token: ObserverToken) {
        self.device().observers.retain(|(t, _)| *t != token);
    }
}

impl VolumeSurface for MockPlatform {
    fn attach(&self) {
        self.device().surface_attached = true;
    }

    fn detach(&self) {
        self.device().surface_attached = false;
    }

    fn set_hidden(&self, hidden: bool) {
        self.device().surface_hidden = hidden;
    }

    fn set_volume(&self, volume: f32) {
        self.device().surface_writes.push(volume);
        self.change_volume(volume);
    }
}
