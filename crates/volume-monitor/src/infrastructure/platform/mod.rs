//! Platform adapters for the audio session and the hidden volume surface.
//!
//! The correct implementation is selected at compile time via `#[cfg(target_os = ...)]`.
//! `mock` is always available; the simulator binary and the tests run on it.

pub mod mock;

#[cfg(target_os = "ios")]
pub mod ios;
