//! Safe operating band for the pinned baseline volume.
//!
//! A press at volume 1.0 cannot raise the volume any further, so the platform
//! reports no change and the press is lost.  The same holds for 0.0 and the
//! down button.  The monitor therefore keeps its baseline inside
//! `[MIN_VOLUME, MAX_VOLUME]`, forcing the platform volume back into the band
//! whenever it drifts out.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest baseline the monitor accepts.
pub const MIN_VOLUME: f32 = 0.05;

/// Highest baseline the monitor accepts.
pub const MAX_VOLUME: f32 = 0.95;

/// Errors raised when constructing a custom band.
#[derive(Debug, Error, PartialEq)]
pub enum BoundsError {
    /// A bound is NaN or infinite.
    #[error("volume bound must be finite, got {0}")]
    NotFinite(f32),

    /// A bound lies outside the platform range `0.0..=1.0`.
    #[error("volume bound {0} lies outside 0.0..=1.0")]
    OutOfRange(f32),

    /// The lower bound is not strictly below the upper bound.
    #[error("min volume {min} must be strictly below max volume {max}")]
    Inverted { min: f32, max: f32 },
}

/// Result of pinning a raw platform volume into the band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinnedVolume {
    /// The value to use as baseline.
    pub baseline: f32,
    /// `true` when the platform volume differs from `baseline` and must be
    /// written back.
    pub forced: bool,
}

/// The `[min, max]` band the baseline is clamped to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeBounds {
    min: f32,
    max: f32,
}

impl VolumeBounds {
    /// Builds a custom band.
    ///
    /// # Errors
    ///
    /// Returns [`BoundsError`] when either bound is non-finite, outside
    /// `0.0..=1.0`, or when `min >= max`.
    pub fn new(min: f32, max: f32) -> Result<Self, BoundsError> {
        for bound in [min, max] {
            if !bound.is_finite() {
                return Err(BoundsError::NotFinite(bound));
            }
            if !(0.0..=1.0).contains(&bound) {
                return Err(BoundsError::OutOfRange(bound));
            }
        }
        if min >= max {
            return Err(BoundsError::Inverted { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    /// Returns `true` if `volume` lies inside the band (inclusive).
    pub fn contains(&self, volume: f32) -> bool {
        (self.min..=self.max).contains(&volume)
    }

    /// Pins a raw platform volume into the band.
    ///
    /// Values above `max` pin to `max`, values below `min` pin to `min`; both
    /// cases report `forced = true`.  In-band values are returned untouched.
    /// A non-finite reading pins to `min`.
    pub fn pin(&self, raw: f32) -> PinnedVolume {
        if !raw.is_finite() {
            PinnedVolume {
                baseline: self.min,
                forced: true,
            }
        } else if raw > self.max {
            PinnedVolume {
                baseline: self.max,
                forced: true,
            }
        } else if raw < self.min {
            PinnedVolume {
                baseline: self.min,
                forced: true,
            }
        } else {
            PinnedVolume {
                baseline: raw,
                forced: false,
            }
        }
    }
}

impl Default for VolumeBounds {
    fn default() -> Self {
        Self {
            min: MIN_VOLUME,
            max: MAX_VOLUME,
        }
    }
}
