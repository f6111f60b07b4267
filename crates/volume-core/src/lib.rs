//! # volume-core
//!
//! Shared library for the volume-button monitor containing the domain types
//! and the pure state machine that interprets output-volume changes.
//!
//! It has zero dependencies on OS APIs, UI frameworks, or async runtimes.
//!
//! # Architecture overview (for beginners)
//!
//! Mobile platforms do not expose the physical volume buttons as key events.
//! What they do expose is the *output volume*: pressing a button nudges it up
//! or down by one step (1/16 on iOS) and the platform announces the change.
//! A volume-button monitor therefore watches the output volume and decides,
//! for every change, whether it was a genuine button press or something else
//! (Control Center slider, lock-screen controls, the monitor's own writes).
//!
//! This crate (`volume-core`) holds the rules for that decision:
//!
//! - **`domain::events`** – What the platform reports: a volume change with
//!   its old and new value, interruption phases, app activity.
//!
//! - **`domain::bounds`** – The safe operating band `[0.05, 0.95]`.  Keeping
//!   the baseline away from the hard 0/1 limits guarantees every press
//!   produces a visible delta in both directions.
//!
//! - **`domain::step`** – The canonical single-press step and the classifier
//!   that separates presses from noise.
//!
//! - **`domain::state`** – `MonitorState`, the per-monitor flags, and the
//!   transition function that turns a volume change into a decision.
//!
//! The platform-facing crate (`volume-monitor`) executes those decisions.

pub mod domain;

pub use domain::bounds::{BoundsError, PinnedVolume, VolumeBounds, MAX_VOLUME, MIN_VOLUME};
pub use domain::events::{AppActivity, ButtonDirection, InterruptionPhase, VolumeChange};
pub use domain::state::{IgnoreReason, MonitorState, VolumeDecision};
pub use domain::step::{classify, Classification, StepBand, CANONICAL_STEP, STEP_TOLERANCE};
