//! SignalEvent — A signal occurrence with metadata
//!
//! Wraps a Signal with the simulation time it was raised at and a
//! per-bus sequence number (several signals share a timestamp).

use serde::{Deserialize, Serialize};

use crate::signal::Signal;

/// A signal with timing metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    /// The semantic signal
    pub signal: Signal,

    /// Simulation time in seconds since the session started
    pub timestamp_s: f64,

    /// Emission order on the bus
    pub sequence: u64,
}

impl SignalEvent {
    pub fn new(signal: Signal, timestamp_s: f64, sequence: u64) -> Self {
        Self {
            signal,
            timestamp_s,
            sequence,
        }
    }

    /// Get signal type name
    pub fn type_name(&self) -> &'static str {
        self.signal.type_name()
    }
}
