//! # ff-signal — FactoryFloor Signal System
//!
//! Named, typed signals raised by the simulation core and consumed by
//! presentation collaborators (UI, audio, camera).
//!
//! ## Philosophy
//!
//! The core never calls into presentation code. It raises a [`Signal`]
//! on the [`SignalBus`], the bus stamps it and fans it out to whoever
//! subscribed. Subscribers cannot feed anything back.
//!
//! ```text
//! MatchOrchestrator ─┐
//! Lane ──────────────┼──▶ SignalBus ──▶ UI / audio / camera
//! InspectionCtl ─────┘        │
//!                             └──▶ SignalRecorder ──▶ SignalTrace (JSON)
//! ```

pub mod bus;
pub mod event;
pub mod signal;
pub mod trace;

pub use bus::*;
pub use event::*;
pub use signal::*;
pub use trace::*;
