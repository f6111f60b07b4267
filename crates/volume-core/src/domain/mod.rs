//! Domain entities for the volume-button monitor.
//!
//! This module contains pure business logic with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! The innermost layer of the workspace.  Domain code:
//!
//! - Contains the rules that make a volume change "a button press".
//! - Has **no** imports from audio APIs, UI toolkits or async runtimes.
//! - Can be compiled and tested on any host without a phone attached.
//!
//! The `volume-monitor` crate depends on this module, never the other way round.

/// The safe volume band and baseline pinning.
pub mod bounds;

/// Events delivered by the platform.
pub mod events;

/// Monitor state and its transition function.
pub mod state;

/// Canonical press step and event classification.
pub mod step;
