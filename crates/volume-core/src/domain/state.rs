//! Monitor state and its transition function.
//!
//! `MonitorState` is the only mutable data a monitor owns.  Every platform
//! event is folded into it by one of the methods below, which return a
//! decision describing the side effects the caller must perform (invoke a
//! callback, re-capture the baseline, schedule a corrective write).  The
//! methods themselves never touch the platform, so the whole state machine is
//! testable without a device.
//!
//! # Event pipeline (for beginners)
//!
//! ```text
//! VolumeChange ─► inactive? ──yes──► Ignored(Inactive)
//!                    │no
//!                    ▼
//!               suppressed? ─yes──► Ignored(SelfInflicted)   (flag cleared)
//!                    │no
//!                    ▼
//!               classify() ──► Seed  ─► Seeded
//!                          ├─► Noise ─► Noise                 (caller rebaselines)
//!                          └─► Press ─► Press { direction, restore_to }
//! ```

use super::bounds::{PinnedVolume, VolumeBounds};
use super::events::{AppActivity, ButtonDirection, VolumeChange};
use super::step::{classify, Classification, StepBand};

/// Why a volume change was dropped without classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The host app is not in the foreground.
    Inactive,
    /// The change is the echo of the monitor's own write.
    SelfInflicted,
}

/// What the caller must do after a volume change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VolumeDecision {
    /// Nothing to do.
    Ignored(IgnoreReason),
    /// Registration-time emission; `current_volume` was seeded.
    Seeded,
    /// Not a press; the caller must re-capture the baseline.
    Noise,
    /// A genuine press.  When `restore_to` is set, the caller must schedule a
    /// corrective write of that volume.
    Press {
        direction: ButtonDirection,
        restore_to: Option<f32>,
    },
}

/// Per-monitor state.
///
/// Invariant: `bounds.min() <= baseline_volume <= bounds.max()`.
#[derive(Debug, Clone)]
pub struct MonitorState {
    bounds: VolumeBounds,
    baseline_volume: f32,
    current_volume: f32,
    is_active: bool,
    is_running: bool,
    suppress_next_callback: bool,
    exact_step_mode_enabled: bool,
    suppress_native_ui: bool,
}

impl MonitorState {
    /// Fresh state: active, not running, exact-step mode off.
    pub fn new(bounds: VolumeBounds) -> Self {
        Self {
            bounds,
            baseline_volume: bounds.min(),
            current_volume: 0.0,
            is_active: true,
            is_running: false,
            suppress_next_callback: false,
            exact_step_mode_enabled: false,
            suppress_native_ui: false,
        }
    }

    pub fn bounds(&self) -> VolumeBounds {
        self.bounds
    }

    pub fn baseline_volume(&self) -> f32 {
        self.baseline_volume
    }

    pub fn current_volume(&self) -> f32 {
        self.current_volume
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn suppress_next_callback(&self) -> bool {
        self.suppress_next_callback
    }

    pub fn exact_step_mode_enabled(&self) -> bool {
        self.exact_step_mode_enabled
    }

    pub fn suppress_native_ui(&self) -> bool {
        self.suppress_native_ui
    }

    pub fn set_exact_step_mode(&mut self, enabled: bool) {
        self.exact_step_mode_enabled = enabled;
    }

    /// Marks the monitor as subscribed.
    ///
    /// A suppression flag left over from a previous run is dropped: its echo
    /// can no longer arrive.
    pub fn mark_started(&mut self, suppress_native_ui: bool) {
        self.is_running = true;
        self.suppress_native_ui = suppress_native_ui;
        self.suppress_next_callback = false;
    }

    pub fn mark_stopped(&mut self) {
        self.is_running = false;
    }

    /// Arms the one-shot suppression ahead of a programmatic volume write.
    pub fn arm_suppression(&mut self) {
        self.suppress_next_callback = true;
    }

    /// Pins `raw` into the bounds without committing it.
    pub fn pin(&self, raw: f32) -> PinnedVolume {
        self.bounds.pin(raw)
    }

    /// Commits a pinned baseline and syncs `current_volume` to it.
    ///
    /// When the platform volume has to be forced and `expect_echo` is set
    /// (the observer is live), the suppression flag is armed so the echo of
    /// the forced write is swallowed.
    pub fn apply_baseline(&mut self, pinned: PinnedVolume, expect_echo: bool) {
        self.baseline_volume = pinned.baseline;
        self.current_volume = pinned.baseline;
        if pinned.forced && expect_echo {
            self.suppress_next_callback = true;
        }
    }

    /// Folds a volume change into the state.
    pub fn on_volume_change(&mut self, change: VolumeChange, band: StepBand) -> VolumeDecision {
        if !self.is_active {
            return VolumeDecision::Ignored(IgnoreReason::Inactive);
        }

        if self.suppress_next_callback {
            self.suppress_next_callback = false;
            return VolumeDecision::Ignored(IgnoreReason::SelfInflicted);
        }

        match classify(change, self.exact_step_mode_enabled, band) {
            Classification::Seed => {
                self.current_volume = change.new;
                VolumeDecision::Seeded
            }
            Classification::Noise => VolumeDecision::Noise,
            Classification::Press(direction) => {
                self.current_volume = change.new;
                VolumeDecision::Press {
                    direction,
                    restore_to: self.suppress_native_ui.then_some(self.baseline_volume),
                }
            }
        }
    }

    /// Records an app-activity change.
    ///
    /// Returns `true` when the caller must rebaseline: the app just became
    /// active while the monitor is running.  A suppression flag armed before
    /// the app went to the background is dropped then: its echo was
    /// delivered while inactive and never consumed it.  The rebaseline
    /// re-arms the flag if it has to force the volume.
    pub fn on_activity(&mut self, activity: AppActivity) -> bool {
        let was_active = self.is_active;
        self.is_active = activity.is_active();
        let rebaseline = self.is_active && !was_active && self.is_running;
        if rebaseline {
            self.suppress_next_callback = false;
        }
        rebaseline
    }
}

impl Default for MonitorState {
    fn default() -> Self {
        Self::new(VolumeBounds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(suppress_native_ui: bool) -> MonitorState {
        let mut state = MonitorState::default();
        let pinned = state.pin(0.5);
        state.apply_baseline(pinned, false);
        state.mark_started(suppress_native_ui);
        state
    }

    #[test]
    fn test_new_state_defaults() {
        let state = MonitorState::default();
        assert!(state.is_active());
        assert!(!state.is_running());
        assert!(!state.exact_step_mode_enabled());
        assert!(!state.suppress_next_callback());
        assert!(state.bounds().contains(state.baseline_volume()));
    }

    #[test]
    fn test_inactive_state_ignores_changes_and_keeps_flags() {
        // Arrange
        let mut state = running(true);
        state.on_activity(AppActivity::Inactive);
        state.arm_suppression();

        // Act
        let decision = state.on_volume_change(VolumeChange::new(0.5, 0.5625), StepBand::default());

        // Assert
        assert_eq!(decision, VolumeDecision::Ignored(IgnoreReason::Inactive));
        assert!(state.suppress_next_callback(), "flag must survive inactive events");
        assert_eq!(state.current_volume(), 0.5);
    }

    #[test]
    fn test_suppression_is_one_shot() {
        let mut state = running(true);
        state.arm_suppression();

        let first = state.on_volume_change(VolumeChange::new(0.5625, 0.5), StepBand::default());
        let second = state.on_volume_change(VolumeChange::new(0.5, 0.5625), StepBand::default());

        assert_eq!(first, VolumeDecision::Ignored(IgnoreReason::SelfInflicted));
        assert!(matches!(second, VolumeDecision::Press { direction: ButtonDirection::Up, .. }));
    }

    #[test]
    fn test_press_requests_restore_only_when_suppressing_native_ui() {
        let mut quiet = running(true);
        let mut loud = running(false);
        let change = VolumeChange::new(0.5, 0.4375);

        assert_eq!(
            quiet.on_volume_change(change, StepBand::default()),
            VolumeDecision::Press {
                direction: ButtonDirection::Down,
                restore_to: Some(0.5)
            }
        );
        assert_eq!(
            loud.on_volume_change(change, StepBand::default()),
            VolumeDecision::Press {
                direction: ButtonDirection::Down,
                restore_to: None
            }
        );
        assert_eq!(quiet.current_volume(), 0.4375);
    }

    #[test]
    fn test_seed_updates_current_volume() {
        let mut state = running(false);
        let decision = state.on_volume_change(VolumeChange::seed(0.3), StepBand::default());
        assert_eq!(decision, VolumeDecision::Seeded);
        assert_eq!(state.current_volume(), 0.3);
    }

    #[test]
    fn test_noise_leaves_current_volume_for_rebaseline() {
        let mut state = running(false);
        state.set_exact_step_mode(true);
        let decision = state.on_volume_change(VolumeChange::new(0.5, 0.7), StepBand::default());
        assert_eq!(decision, VolumeDecision::Noise);
        assert_eq!(state.current_volume(), 0.5);
    }

    #[test]
    fn test_apply_baseline_arms_flag_only_for_forced_live_writes() {
        let mut state = MonitorState::default();

        state.apply_baseline(state.pin(1.0), false);
        assert!(!state.suppress_next_callback());

        state.apply_baseline(state.pin(0.5), true);
        assert!(!state.suppress_next_callback());

        state.apply_baseline(state.pin(0.0), true);
        assert!(state.suppress_next_callback());
        assert_eq!(state.baseline_volume(), 0.05);
        assert_eq!(state.current_volume(), 0.05);
    }

    #[test]
    fn test_foreground_transition_requests_rebaseline_once() {
        let mut state = running(false);
        assert!(!state.on_activity(AppActivity::Inactive));
        assert!(state.on_activity(AppActivity::Active));
        assert!(!state.on_activity(AppActivity::Active), "already active");
    }

    #[test]
    fn test_foreground_transition_drops_stale_suppression() {
        // Arrange: a corrective write armed the flag, its echo arrived in the background
        let mut state = running(true);
        state.arm_suppression();
        state.on_activity(AppActivity::Inactive);
        state.on_volume_change(VolumeChange::new(0.5625, 0.5), StepBand::default());

        // Act
        let rebaseline = state.on_activity(AppActivity::Active);

        // Assert
        assert!(rebaseline);
        assert!(!state.suppress_next_callback());
        assert!(matches!(
            state.on_volume_change(VolumeChange::new(0.5, 0.5625), StepBand::default()),
            VolumeDecision::Press {
                direction: ButtonDirection::Up,
                ..
            }
        ));
    }

    #[test]
    fn test_foreground_transition_while_stopped_does_not_rebaseline() {
        let mut state = MonitorState::default();
        state.on_activity(AppActivity::Inactive);
        assert!(!state.on_activity(AppActivity::Active));
        assert!(state.is_active());
    }

    #[test]
    fn test_mark_started_clears_stale_suppression() {
        let mut state = running(true);
        state.arm_suppression();
        state.mark_stopped();
        state.mark_started(true);
        assert!(!state.suppress_next_callback());
        assert!(state.is_running());
    }
}
