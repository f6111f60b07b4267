//! Application layer for the volume-button monitor.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure rules in `volume-core`) and the infrastructure (audio session, UI
//! widgets, notification delivery).
//!
//! Code in this layer:
//!
//! - **Orchestrates** domain decisions into side effects (call the user's
//!   callback, write the volume back, re-capture the baseline).
//! - **Depends on abstractions** (traits) rather than concrete platform APIs,
//!   so the iOS adapter and the in-memory mock are interchangeable.
//! - **Contains no OS calls**.
//!
//! # Sub-modules
//!
//! - **`platform`** – The collaborator traits: audio session, hidden volume
//!   surface, notification center, main-thread scheduler.
//!
//! - **`monitor`** – `VolumeButtonMonitor`, the single component that wires
//!   those collaborators to the `MonitorState` state machine.

pub mod monitor;
pub mod platform;
