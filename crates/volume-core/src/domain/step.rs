//! Press classification.
//!
//! iOS moves the output volume by exactly 1/16 (0.0625) per button press.
//! Control Center drags, Bluetooth accessories and lock-screen sliders move it
//! by arbitrary amounts.  In *exact-step mode* only deltas inside a narrow band
//! around the canonical step count as presses; everything else is noise.
//!
//! The band is symmetric around [`CANONICAL_STEP`].  A delta *below* the band
//! is still a press when the new volume sits on 0.0 or 1.0: the press
//! saturated at the limit and could only move part of a step.

use serde::{Deserialize, Serialize};

use super::events::{ButtonDirection, VolumeChange};

/// Volume change produced by a single hardware press.
pub const CANONICAL_STEP: f32 = 0.0625;

/// Half-width of the accepted band around [`CANONICAL_STEP`].
pub const STEP_TOLERANCE: f32 = 0.0005;

/// Outcome of classifying one volume change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Registration-time emission (`old == new`); seeds the current volume.
    Seed,
    /// A genuine button press.
    Press(ButtonDirection),
    /// Not a press; the baseline must be re-captured.
    Noise,
}

/// Symmetric tolerance band around the canonical step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepBand {
    pub center: f32,
    pub tolerance: f32,
}

impl StepBand {
    pub fn new(center: f32, tolerance: f32) -> Self {
        Self {
            center,
            tolerance: tolerance.abs(),
        }
    }

    pub fn lower(&self) -> f32 {
        self.center - self.tolerance
    }

    pub fn upper(&self) -> f32 {
        self.center + self.tolerance
    }

    /// `true` if `delta` is a canonical single step.
    pub fn contains(&self, delta: f32) -> bool {
        delta >= self.lower() && delta <= self.upper()
    }

    /// `true` if `delta` is smaller than a canonical step.
    pub fn is_below(&self, delta: f32) -> bool {
        delta < self.lower()
    }
}

impl Default for StepBand {
    fn default() -> Self {
        Self::new(CANONICAL_STEP, STEP_TOLERANCE)
    }
}

/// Classifies a volume change.
///
/// Without exact-step mode every non-seed change is a press.  With it, a
/// change must either match the band or be a saturated press (below the band
/// and landing exactly on 0.0 or 1.0).
pub fn classify(change: VolumeChange, exact_step: bool, band: StepBand) -> Classification {
    if change.is_seed() {
        return Classification::Seed;
    }

    if exact_step {
        let delta = change.delta();
        let saturated = band.is_below(delta) && change.lands_on_extreme();
        if !band.contains(delta) && !saturated {
            return Classification::Noise;
        }
    }

    Classification::Press(change.direction())
}
