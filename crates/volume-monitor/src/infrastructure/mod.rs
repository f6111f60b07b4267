//! Infrastructure layer for the volume-button monitor.
//!
//! Contains the adapters behind the application-layer traits: the iOS audio
//! session and hidden volume view, the in-memory mock device, the local
//! notification center, main-context schedulers, TOML settings, and the
//! simulator script language.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `volume_core`, but MUST NOT be imported by the `application` or domain layers.

pub mod notifications;
pub mod platform;
pub mod scheduler;
pub mod script;
pub mod storage;
