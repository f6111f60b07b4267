//! VolumeButtonMonitor: turns output-volume changes into button callbacks.
//!
//! The monitor owns a [`MonitorState`] and reacts to three platform signals:
//!
//! - **Volume changes** – classified by `volume-core`; genuine presses invoke
//!   `on_volume_up` / `on_volume_down`.
//! - **Interruptions** – the session is re-activated when one ends.
//! - **App activity** – events are ignored in the background and the
//!   baseline is re-captured on return to the foreground.
//!
//! # Native HUD suppression (for beginners)
//!
//! With `suppress_native_ui`, every press is followed by a corrective write
//! that puts the volume back to the baseline, ~100 ms later so it lands after
//! the platform's own volume commit.  That write produces a volume change of
//! its own.  The monitor arms a one-shot flag right before writing, and the
//! next change is swallowed instead of being reported as a press:
//!
//! ```text
//! press  0.50 → 0.5625   ─► on_volume_up(), schedule restore
//! +100ms flag = true, slider ← 0.50
//! echo   0.5625 → 0.50   ─► swallowed, flag = false
//! ```
//!
//! # Locking
//!
//! Notifications may arrive on any thread, so the state sits behind a
//! `Mutex`.  Platform calls and user callbacks are always made with the lock
//! released: a slider write may deliver its volume change synchronously,
//! re-entering the monitor on the same thread.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tracing::{debug, info, trace, warn};
use volume_core::{
    AppActivity, ButtonDirection, IgnoreReason, InterruptionPhase, MonitorState, PinnedVolume,
    StepBand, VolumeBounds, VolumeChange, VolumeDecision,
};

use super::platform::{
    AudioSession, MainThreadScheduler, NotificationCenter, NotificationKind, ObserverToken,
    PlatformNotification, SessionError, VolumeSurface,
};

/// Debounce before the corrective write, so it lands after the platform's
/// pending volume commit.
pub const RESTORE_DELAY: Duration = Duration::from_millis(100);

/// Two volumes closer than this are treated as equal.
const VOLUME_EPSILON: f32 = 1e-4;

/// A no-argument button callback.
pub type VolumeCallback = Arc<dyn Fn() + Send + Sync>;

/// Tuning knobs fixed at construction time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorOptions {
    /// Band the baseline is pinned to.
    pub bounds: VolumeBounds,
    /// Canonical press step used in exact-step mode.
    pub step_band: StepBand,
    /// Delay before the corrective write.
    pub restore_delay: Duration,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            bounds: VolumeBounds::default(),
            step_band: StepBand::default(),
            restore_delay: RESTORE_DELAY,
        }
    }
}

/// The platform collaborators a monitor is built from.
#[derive(Clone)]
pub struct MonitorPlatform {
    pub session: Arc<dyn AudioSession>,
    pub surface: Arc<dyn VolumeSurface>,
    pub notifications: Arc<dyn NotificationCenter>,
    pub scheduler: Arc<dyn MainThreadScheduler>,
}

#[derive(Default)]
struct Callbacks {
    on_up: Option<VolumeCallback>,
    on_down: Option<VolumeCallback>,
}

#[derive(Default)]
struct Subscriptions {
    volume: Option<ObserverToken>,
    notifications: Vec<ObserverToken>,
}

struct Inner {
    platform: MonitorPlatform,
    options: MonitorOptions,
    state: Mutex<MonitorState>,
    callbacks: Mutex<Callbacks>,
    /// Also serializes `start` / `stop`.
    subscriptions: Mutex<Subscriptions>,
}

/// Recovers the guard from a poisoned lock; a panicking user callback must
/// not take the monitor down with it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Detects hardware volume-button presses by observing the output volume.
pub struct VolumeButtonMonitor {
    inner: Arc<Inner>,
}

impl VolumeButtonMonitor {
    /// Creates a monitor and attaches its hidden surface to the root view.
    ///
    /// The monitor starts out active, stopped, with exact-step mode off.
    pub fn new(platform: MonitorPlatform, options: MonitorOptions) -> Self {
        platform.surface.attach();
        let inner = Inner {
            state: Mutex::new(MonitorState::new(options.bounds)),
            callbacks: Mutex::new(Callbacks::default()),
            subscriptions: Mutex::new(Subscriptions::default()),
            platform,
            options,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Creates a monitor with both callbacks assigned.
    pub fn with_callbacks(
        platform: MonitorPlatform,
        options: MonitorOptions,
        on_volume_up: Option<VolumeCallback>,
        on_volume_down: Option<VolumeCallback>,
    ) -> Self {
        let monitor = Self::new(platform, options);
        monitor.set_on_volume_up(on_volume_up);
        monitor.set_on_volume_down(on_volume_down);
        monitor
    }

    pub fn set_on_volume_up(&self, callback: Option<VolumeCallback>) {
        lock(&self.inner.callbacks).on_up = callback;
    }

    pub fn set_on_volume_down(&self, callback: Option<VolumeCallback>) {
        lock(&self.inner.callbacks).on_down = callback;
    }

    /// Subscribes to the platform and starts reporting presses.
    ///
    /// No-op when already running.  A session that cannot be activated is
    /// logged and the monitor runs degraded.
    pub fn start(&self, suppress_native_ui: bool) {
        let inner = &self.inner;
        let mut subscriptions = lock(&inner.subscriptions);
        if lock(&inner.state).is_running() {
            debug!("volume monitor already running");
            return;
        }

        if let Err(e) = inner.activate_session() {
            warn!("continuing without an active audio session: {e}");
        }

        let pinned = inner.rebaseline_with(false);

        let weak = Arc::downgrade(inner);
        subscriptions.volume = Some(inner.platform.session.observe_output_volume(Arc::new(
            move |change: VolumeChange| {
                if let Some(inner) = weak.upgrade() {
                    inner.handle_volume_change(change);
                }
            },
        )));
        for kind in [NotificationKind::Interruption, NotificationKind::AppActivity] {
            let weak: Weak<Inner> = Arc::downgrade(inner);
            let token = inner.platform.notifications.add_observer(
                kind,
                Arc::new(move |notification: PlatformNotification| {
                    if let Some(inner) = weak.upgrade() {
                        inner.handle_notification(notification);
                    }
                }),
            );
            subscriptions.notifications.push(token);
        }

        inner.platform.surface.set_hidden(!suppress_native_ui);

        // A forced write that has not landed yet will echo into the new observer.
        let pending_echo = pinned.forced
            && (inner.platform.session.output_volume() - pinned.baseline).abs() > VOLUME_EPSILON;
        {
            let mut state = lock(&inner.state);
            state.mark_started(suppress_native_ui);
            if pending_echo {
                state.arm_suppression();
            }
        }

        info!(
            suppress_native_ui,
            baseline = pinned.baseline,
            "volume monitor started"
        );
    }

    /// Unsubscribes from the platform.  No-op when not running.
    pub fn stop(&self) {
        let inner = &self.inner;
        let mut subscriptions = lock(&inner.subscriptions);
        if !lock(&inner.state).is_running() {
            return;
        }

        if let Some(token) = subscriptions.volume.take() {
            inner.platform.session.remove_volume_observer(token);
        }
        for token in subscriptions.notifications.drain(..) {
            inner.platform.notifications.remove_observer(token);
        }
        inner.platform.surface.set_hidden(true);
        lock(&inner.state).mark_stopped();

        info!("volume monitor stopped");
    }

    /// Re-captures the baseline from the platform volume, forcing the
    /// platform back into the safe band when needed.
    ///
    /// Returns the new baseline.
    pub fn rebaseline(&self) -> f32 {
        let running = lock(&self.inner.state).is_running();
        self.inner.rebaseline_with(running).baseline
    }

    /// Enables or disables exact-step mode; applies from the next event.
    pub fn set_exact_step_mode(&self, enabled: bool) {
        lock(&self.inner.state).set_exact_step_mode(enabled);
        debug!(enabled, "exact-step mode changed");
    }

    pub fn exact_step_mode(&self) -> bool {
        lock(&self.inner.state).exact_step_mode_enabled()
    }

    /// Last observed output volume.
    pub fn current_volume(&self) -> f32 {
        lock(&self.inner.state).current_volume()
    }

    pub fn baseline_volume(&self) -> f32 {
        lock(&self.inner.state).baseline_volume()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.inner.state).is_running()
    }

    pub fn is_active(&self) -> bool {
        lock(&self.inner.state).is_active()
    }

    pub fn options(&self) -> MonitorOptions {
        self.inner.options
    }
}

impl Drop for VolumeButtonMonitor {
    fn drop(&mut self) {
        self.stop();
        // Deferred so the view hierarchy is not mutated mid-dispatch.
        let surface = Arc::clone(&self.inner.platform.surface);
        self.inner
            .platform
            .scheduler
            .schedule(Box::new(move || surface.detach()));
    }
}

// ── Event handlers ────────────────────────────────────────────────────────────

impl Inner {
    fn activate_session(&self) -> Result<(), SessionError> {
        self.platform.session.set_playback_mixable_category()?;
        self.platform.session.set_active(true)
    }

    fn rebaseline_with(&self, expect_echo: bool) -> PinnedVolume {
        let raw = self.platform.session.output_volume();
        let pinned = {
            let mut state = lock(&self.state);
            let pinned = state.pin(raw);
            state.apply_baseline(pinned, expect_echo);
            pinned
        };

        if pinned.forced {
            debug!(raw, baseline = pinned.baseline, "forcing output volume into band");
            self.platform.surface.set_volume(pinned.baseline);
        }
        trace!(raw, baseline = pinned.baseline, "baseline captured");
        pinned
    }

    fn handle_volume_change(self: &Arc<Self>, change: VolumeChange) {
        let decision = lock(&self.state).on_volume_change(change, self.options.step_band);

        match decision {
            VolumeDecision::Ignored(IgnoreReason::Inactive) => {
                trace!(old = change.old, new = change.new, "ignoring volume change while inactive");
            }
            VolumeDecision::Ignored(IgnoreReason::SelfInflicted) => {
                trace!(old = change.old, new = change.new, "swallowed echo of corrective write");
            }
            VolumeDecision::Seeded => {
                trace!(volume = change.new, "volume observer seeded");
            }
            VolumeDecision::Noise => {
                debug!(
                    old = change.old,
                    new = change.new,
                    "volume change is not a single step, rebaselining"
                );
                self.rebaseline_with(true);
            }
            VolumeDecision::Press {
                direction,
                restore_to,
            } => {
                debug!(%direction, old = change.old, new = change.new, "volume button pressed");
                self.dispatch(direction);
                if let Some(target) = restore_to {
                    self.schedule_restore(target);
                }
            }
        }
    }

    fn dispatch(&self, direction: ButtonDirection) {
        let callback = {
            let callbacks = lock(&self.callbacks);
            match direction {
                ButtonDirection::Up => callbacks.on_up.clone(),
                ButtonDirection::Down => callbacks.on_down.clone(),
            }
        };
        if let Some(callback) = callback {
            callback();
        }
    }

    fn schedule_restore(self: &Arc<Self>, target: f32) {
        let weak = Arc::downgrade(self);
        self.platform.scheduler.schedule_after(
            self.options.restore_delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.restore_volume(target);
                }
            }),
        );
    }

    /// Writes `target` back to the platform.
    ///
    /// The suppression flag is armed only while running and active.  After
    /// `stop()` the echo is never delivered, and in the background it is
    /// ignored before it can consume the flag.
    fn restore_volume(&self, target: f32) {
        let platform_volume = self.platform.session.output_volume();
        if (platform_volume - target).abs() <= VOLUME_EPSILON {
            trace!(target, "output volume already at baseline, skipping restore");
            return;
        }

        {
            let mut state = lock(&self.state);
            if state.is_running() && state.is_active() {
                state.arm_suppression();
            }
        }
        trace!(from = platform_volume, to = target, "restoring baseline volume");
        self.platform.surface.set_volume(target);
    }

    fn handle_notification(&self, notification: PlatformNotification) {
        match notification {
            PlatformNotification::Interruption(phase) => self.handle_interruption(phase),
            PlatformNotification::AppActivity(activity) => self.handle_activity(activity),
        }
    }

    fn handle_interruption(&self, phase: InterruptionPhase) {
        match phase {
            InterruptionPhase::Began => info!("audio session interruption began"),
            InterruptionPhase::Ended => {
                info!("audio session interruption ended, reactivating");
                if let Err(e) = self.platform.session.set_active(true) {
                    warn!("failed to reactivate audio session after interruption: {e}");
                }
            }
        }
    }

    fn handle_activity(&self, activity: AppActivity) {
        let rebaseline = lock(&self.state).on_activity(activity);
        debug!(?activity, "app activity changed");
        if rebaseline {
            self.rebaseline_with(true);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::platform::{
        MainTask, MockAudioSession, MockVolumeSurface, NotificationHandler,
    };
    use uuid::Uuid;

    // ── Minimal collaborators ─────────────────────────────────────────────────

    #[derive(Default)]
    struct NullNotifications {
        added: Mutex<Vec<NotificationKind>>,
        removed: Mutex<Vec<ObserverToken>>,
    }

    impl NotificationCenter for NullNotifications {
        fn add_observer(&self, kind: NotificationKind, _: NotificationHandler) -> ObserverToken {
            self.added.lock().unwrap().push(kind);
            Uuid::new_v4()
        }

        fn remove_observer(&self, token: ObserverToken) {
            self.removed.lock().unwrap().push(token);
        }
    }

    #[derive(Default)]
    struct QueueScheduler {
        tasks: Mutex<Vec<(Duration, MainTask)>>,
    }

    impl MainThreadScheduler for QueueScheduler {
        fn schedule_after(&self, delay: Duration, task: MainTask) {
            self.tasks.lock().unwrap().push((delay, task));
        }
    }

    fn quiet_surface() -> MockVolumeSurface {
        let mut surface = MockVolumeSurface::new();
        surface.expect_attach().return_const(());
        surface.expect_detach().return_const(());
        surface.expect_set_hidden().return_const(());
        surface
    }

    fn platform(
        session: MockAudioSession,
        surface: MockVolumeSurface,
    ) -> (MonitorPlatform, Arc<NullNotifications>, Arc<QueueScheduler>) {
        let notifications = Arc::new(NullNotifications::default());
        let scheduler = Arc::new(QueueScheduler::default());
        let platform = MonitorPlatform {
            session: Arc::new(session),
            surface: Arc::new(surface),
            notifications: notifications.clone(),
            scheduler: scheduler.clone(),
        };
        (platform, notifications, scheduler)
    }

    #[test]
    fn test_start_continues_when_session_activation_fails() {
        // Arrange
        let mut session = MockAudioSession::new();
        session.expect_set_playback_mixable_category().returning(|| Ok(()));
        session
            .expect_set_active()
            .returning(|_| Err(SessionError::Activation("denied".to_string())));
        session.expect_output_volume().return_const(0.5_f32);
        session
            .expect_observe_output_volume()
            .times(1)
            .returning(|handler| {
                handler(VolumeChange::seed(0.5));
                Uuid::new_v4()
            });
        session.expect_remove_volume_observer().return_const(());
        let (platform, notifications, _) = platform(session, quiet_surface());
        let monitor = VolumeButtonMonitor::new(platform, MonitorOptions::default());

        // Act
        monitor.start(false);

        // Assert
        assert!(monitor.is_running());
        assert_eq!(monitor.current_volume(), 0.5);
        assert_eq!(notifications.added.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_category_failure_skips_activation_but_still_subscribes() {
        let mut session = MockAudioSession::new();
        session
            .expect_set_playback_mixable_category()
            .returning(|| Err(SessionError::Category("busy".to_string())));
        session.expect_set_active().never();
        session.expect_output_volume().return_const(0.5_f32);
        session
            .expect_observe_output_volume()
            .times(1)
            .returning(|_| Uuid::new_v4());
        session.expect_remove_volume_observer().return_const(());
        let (platform, _, _) = platform(session, quiet_surface());
        let monitor = VolumeButtonMonitor::new(platform, MonitorOptions::default());

        monitor.start(true);

        assert!(monitor.is_running());
    }

    #[test]
    fn test_start_forces_out_of_band_volume_through_surface() {
        // Arrange: device is at full volume
        let mut session = MockAudioSession::new();
        session.expect_set_playback_mixable_category().returning(|| Ok(()));
        session.expect_set_active().returning(|_| Ok(()));
        session.expect_output_volume().return_const(1.0_f32);
        session
            .expect_observe_output_volume()
            .returning(|_| Uuid::new_v4());
        session.expect_remove_volume_observer().return_const(());
        let mut surface = quiet_surface();
        surface
            .expect_set_volume()
            .withf(|v| *v == 0.95)
            .times(1)
            .return_const(());
        let (platform, _, _) = platform(session, surface);
        let monitor = VolumeButtonMonitor::new(platform, MonitorOptions::default());

        // Act
        monitor.start(true);

        // Assert
        assert_eq!(monitor.baseline_volume(), 0.95);
        assert_eq!(monitor.current_volume(), 0.95);
    }

    #[test]
    fn test_stop_removes_every_subscription() {
        let mut session = MockAudioSession::new();
        session.expect_set_playback_mixable_category().returning(|| Ok(()));
        session.expect_set_active().returning(|_| Ok(()));
        session.expect_output_volume().return_const(0.5_f32);
        session
            .expect_observe_output_volume()
            .returning(|_| Uuid::new_v4());
        session.expect_remove_volume_observer().times(1).return_const(());
        let (platform, notifications, _) = platform(session, quiet_surface());
        let monitor = VolumeButtonMonitor::new(platform, MonitorOptions::default());

        monitor.start(false);
        monitor.stop();
        monitor.stop();

        assert!(!monitor.is_running());
        assert_eq!(notifications.removed.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_drop_defers_surface_detach_to_scheduler() {
        let session = MockAudioSession::new();
        let (platform, _, scheduler) = platform(session, quiet_surface());
        let monitor = VolumeButtonMonitor::new(platform, MonitorOptions::default());

        drop(monitor);

        let tasks = std::mem::take(&mut *scheduler.tasks.lock().unwrap());
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].0, Duration::ZERO);
        for (_, task) in tasks {
            task();
        }
    }

    #[test]
    fn test_default_options_use_hundred_millisecond_restore_delay() {
        let options = MonitorOptions::default();
        assert_eq!(options.restore_delay, Duration::from_millis(100));
        assert_eq!(options.bounds, VolumeBounds::default());
    }
}
