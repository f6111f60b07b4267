//! Collaborator traits consumed by the monitor.
//!
//! The monitor never talks to a platform API directly.  Everything it needs
//! is expressed here as four small traits:
//!
//! | trait | iOS counterpart |
//! |---|---|
//! | [`AudioSession`] | `AVAudioSession` (category, activation, `outputVolume` KVO) |
//! | [`VolumeSurface`] | an off-screen `MPVolumeView` and its slider |
//! | [`NotificationCenter`] | `NSNotificationCenter` (interruption, did-become-active) |
//! | [`MainThreadScheduler`] | `DispatchQueue.main.asyncAfter` |
//!
//! # Testability
//!
//! `infrastructure::platform::mock::MockPlatform` implements the first two
//! in memory, `infrastructure::notifications::LocalNotificationCenter` the
//! third, and `infrastructure::scheduler::ManualScheduler` the fourth, so the
//! whole monitor runs in unit tests without a device.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;
use volume_core::{AppActivity, InterruptionPhase, VolumeChange};

/// Opaque handle returned by observer registration.
pub type ObserverToken = Uuid;

/// Receives every output-volume change.
pub type VolumeHandler = Arc<dyn Fn(VolumeChange) + Send + Sync>;

/// Receives broadcast notifications of one [`NotificationKind`].
pub type NotificationHandler = Arc<dyn Fn(PlatformNotification) + Send + Sync>;

/// Work item run on the main/UI context.
pub type MainTask = Box<dyn FnOnce() + Send + 'static>;

/// Platform session errors.
///
/// These are the only runtime errors the monitor knows about.  They are
/// logged and never propagated: volume observation keeps working without an
/// active session on most platforms.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error("failed to set audio session category: {0}")]
    Category(String),
    #[error("failed to activate audio session: {0}")]
    Activation(String),
    #[error("audio session unavailable: {0}")]
    Unavailable(String),
}

/// Broadcast topics the monitor subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Interruption,
    AppActivity,
}

/// A broadcast notification delivered by a [`NotificationCenter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformNotification {
    Interruption(InterruptionPhase),
    AppActivity(AppActivity),
}

impl PlatformNotification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            PlatformNotification::Interruption(_) => NotificationKind::Interruption,
            PlatformNotification::AppActivity(_) => NotificationKind::AppActivity,
        }
    }
}

/// The platform audio session.
#[cfg_attr(test, mockall::automock)]
pub trait AudioSession: Send + Sync {
    /// Selects a playback category that mixes with other audio and does not
    /// require exclusive focus.
    fn set_playback_mixable_category(&self) -> Result<(), SessionError>;

    /// Activates or deactivates the session.
    fn set_active(&self, active: bool) -> Result<(), SessionError>;

    /// Current output volume in `0.0..=1.0`.
    fn output_volume(&self) -> f32;

    /// Registers an output-volume observer.
    ///
    /// Implementations must invoke `handler` once, synchronously, before
    /// returning, with `VolumeChange::seed(current)`, then once per change.
    fn observe_output_volume(&self, handler: VolumeHandler) -> ObserverToken;

    /// Removes an observer registered with [`observe_output_volume`](Self::observe_output_volume).
    fn remove_volume_observer(&self, token: ObserverToken);
}

/// The hidden volume-control surface.
///
/// While this surface is in the view hierarchy and visible (off-screen),
/// the platform routes volume changes through it instead of showing the
/// system HUD.  Writes through its slider are committed asynchronously.
#[cfg_attr(test, mockall::automock)]
pub trait VolumeSurface: Send + Sync {
    /// Adds the surface to the application's root view.
    fn attach(&self);
    /// Removes the surface from the view hierarchy.
    fn detach(&self);
    /// Shows or hides the surface.
    fn set_hidden(&self, hidden: bool);
    /// Writes the output volume through the surface's slider.
    fn set_volume(&self, volume: f32);
}

/// Broadcast subscription service.
pub trait NotificationCenter: Send + Sync {
    fn add_observer(&self, kind: NotificationKind, handler: NotificationHandler) -> ObserverToken;
    fn remove_observer(&self, token: ObserverToken);
}

/// Runs work on the main/UI execution context.
pub trait MainThreadScheduler: Send + Sync {
    /// Runs `task` after `delay`.  Fire-and-forget; there is no cancellation.
    fn schedule_after(&self, delay: Duration, task: MainTask);

    /// Runs `task` on the next turn of the main context.
    fn schedule(&self, task: MainTask) {
        self.schedule_after(Duration::ZERO, task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_kind_matches_variant() {
        assert_eq!(
            PlatformNotification::Interruption(InterruptionPhase::Began).kind(),
            NotificationKind::Interruption
        );
        assert_eq!(
            PlatformNotification::AppActivity(AppActivity::Active).kind(),
            NotificationKind::AppActivity
        );
    }

    #[test]
    fn test_session_error_messages_name_the_failure() {
        let err = SessionError::Activation("code 560030580".to_string());
        assert_eq!(err.to_string(), "failed to activate audio session: code 560030580");
    }
}
