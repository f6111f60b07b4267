//! Platform events consumed by the monitor.

use serde::{Deserialize, Serialize};

/// A single output-volume change reported by the platform observer.
///
/// Volumes are normalised to `0.0..=1.0`.  The observer also emits one change
/// at registration time with `old == new`; see [`VolumeChange::is_seed`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeChange {
    /// Volume before the change.
    pub old: f32,
    /// Volume after the change.
    pub new: f32,
}

impl VolumeChange {
    pub fn new(old: f32, new: f32) -> Self {
        Self { old, new }
    }

    /// The initial emission made when an observer is registered.
    pub fn seed(current: f32) -> Self {
        Self {
            old: current,
            new: current,
        }
    }

    /// Absolute size of the change.
    pub fn delta(&self) -> f32 {
        (self.new - self.old).abs()
    }

    /// `true` when the change carries no movement, i.e. the registration-time
    /// emission that only seeds the current volume.
    pub fn is_seed(&self) -> bool {
        self.old == self.new
    }

    /// `true` when the new value sits on a hard limit of the volume range.
    pub fn lands_on_extreme(&self) -> bool {
        self.new == 0.0 || self.new == 1.0
    }

    /// Direction implied by the change: up iff the volume increased.
    pub fn direction(&self) -> ButtonDirection {
        if self.new > self.old {
            ButtonDirection::Up
        } else {
            ButtonDirection::Down
        }
    }
}

/// Which hardware button a press is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ButtonDirection {
    Up,
    Down,
}

impl std::fmt::Display for ButtonDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ButtonDirection::Up => f.write_str("up"),
            ButtonDirection::Down => f.write_str("down"),
        }
    }
}

/// Phase of an audio-session interruption (phone call, alarm, Siri...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterruptionPhase {
    Began,
    Ended,
}

/// Foreground state of the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppActivity {
    /// The app became active (foregrounded).
    Active,
    /// The app resigned active (backgrounded, Control Center pulled down...).
    Inactive,
}

impl AppActivity {
    pub fn is_active(self) -> bool {
        matches!(self, AppActivity::Active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_is_absolute() {
        assert_eq!(VolumeChange::new(0.5, 0.25).delta(), 0.25);
        assert_eq!(VolumeChange::new(0.25, 0.5).delta(), 0.25);
    }

    #[test]
    fn test_seed_has_no_movement() {
        let change = VolumeChange::seed(0.4);
        assert!(change.is_seed());
        assert_eq!(change.delta(), 0.0);
    }

    #[test]
    fn test_direction_up_only_when_volume_increases() {
        assert_eq!(VolumeChange::new(0.5, 0.5625).direction(), ButtonDirection::Up);
        assert_eq!(VolumeChange::new(0.5, 0.4375).direction(), ButtonDirection::Down);
    }

    #[test]
    fn test_lands_on_extreme_detects_hard_limits() {
        assert!(VolumeChange::new(0.03, 0.0).lands_on_extreme());
        assert!(VolumeChange::new(0.97, 1.0).lands_on_extreme());
        assert!(!VolumeChange::new(0.5, 0.95).lands_on_extreme());
    }

    #[test]
    fn test_app_activity_is_active() {
        assert!(AppActivity::Active.is_active());
        assert!(!AppActivity::Inactive.is_active());
    }
}
