//! SignalTrace — A recorded sequence of signals for one session
//!
//! Used by the headless runner to dump a match timeline and by tests to
//! assert on what presentation would have seen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::SignalEvent;
use crate::signal::{GameOverReason, Signal, SignalCategory};

/// A complete trace of signals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalTrace {
    /// Unique identifier for this trace
    pub trace_id: String,

    /// Optional session identifier
    #[serde(default)]
    pub session_id: Option<String>,

    /// All events in emission order
    pub events: Vec<SignalEvent>,

    /// When this trace was recorded
    pub recorded_at: DateTime<Utc>,

    /// Custom metadata (seed, policy, ...)
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl SignalTrace {
    /// Create a new empty trace
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            session_id: None,
            events: Vec::new(),
            recorded_at: Utc::now(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Create a trace from recorded events
    pub fn from_events(trace_id: impl Into<String>, events: Vec<SignalEvent>) -> Self {
        let mut trace = Self::new(trace_id);
        trace.events = events;
        trace
    }

    pub fn push(&mut self, event: SignalEvent) {
        self.events.push(event);
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Time between first and last event, in seconds
    pub fn duration_s(&self) -> f64 {
        match (self.events.first(), self.events.last()) {
            (Some(first), Some(last)) => last.timestamp_s - first.timestamp_s,
            _ => 0.0,
        }
    }

    pub fn events_by_category(&self, category: SignalCategory) -> Vec<&SignalEvent> {
        self.events
            .iter()
            .filter(|e| e.signal.category() == category)
            .collect()
    }

    pub fn events_by_type(&self, type_name: &str) -> Vec<&SignalEvent> {
        self.events
            .iter()
            .filter(|e| e.type_name() == type_name)
            .collect()
    }

    pub fn count(&self, type_name: &str) -> usize {
        self.events.iter().filter(|e| e.type_name() == type_name).count()
    }

    pub fn has_signal(&self, type_name: &str) -> bool {
        self.events.iter().any(|e| e.type_name() == type_name)
    }

    /// Last reported score
    pub fn final_score(&self) -> u32 {
        self.events
            .iter()
            .rev()
            .find_map(|e| match e.signal {
                Signal::ScoreUpdated { total } => Some(total),
                _ => None,
            })
            .unwrap_or(0)
    }

    /// Highest wave that started
    pub fn max_wave(&self) -> u32 {
        self.events
            .iter()
            .filter_map(|e| match e.signal {
                Signal::WaveStarted { wave } => Some(wave),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    pub fn game_over_reason(&self) -> Option<GameOverReason> {
        self.events.iter().rev().find_map(|e| match e.signal {
            Signal::GameOver { reason } => Some(reason),
            _ => None,
        })
    }

    pub fn summary(&self) -> TraceSummary {
        TraceSummary {
            trace_id: self.trace_id.clone(),
            event_count: self.events.len(),
            duration_s: self.duration_s(),
            waves_started: self.max_wave(),
            successes: self.count("product_success"),
            mistakes: self.count("mistake_made"),
            final_score: self.final_score(),
            game_over: self.game_over_reason(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Summary of a trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceSummary {
    pub trace_id: String,
    pub event_count: usize,
    pub duration_s: f64,
    pub waves_started: u32,
    pub successes: usize,
    pub mistakes: usize,
    pub final_score: u32,
    pub game_over: Option<GameOverReason>,
}
