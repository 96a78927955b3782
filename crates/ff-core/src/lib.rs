//! ff-core: Shared types for FactoryFloor
//!
//! Identifiers and the error taxonomy used by every other crate in the
//! workspace. Nothing here knows about lanes, waves or signals.

mod error;
mod ids;

pub use error::*;
pub use ids::*;
