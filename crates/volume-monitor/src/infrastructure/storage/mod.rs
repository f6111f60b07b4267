//! Storage infrastructure: settings file persistence.
//!
//! The `config` sub-module handles:
//!
//! - Reading the TOML settings file the simulator (or a host app) points at.
//! - Writing settings back to disk.
//! - Providing defaults when the file does not exist yet.
//!
//! Monitor *state* is never persisted; only the knobs it is built with.

pub mod config;
