//! Signal Bus
//!
//! Owns the subscription lists. The core emits, the bus stamps and fans
//! out, subscribers observe.
//!
//! ## Delivery rules
//!
//! - Delivery is synchronous and in subscription order.
//! - Callbacks return nothing; presentation cannot steer the core.
//! - `unsubscribe` takes effect immediately, so a collaborator tearing
//!   itself down never receives another signal.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::event::SignalEvent;
use crate::signal::{Signal, SignalCategory};

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Boxed subscriber callback
pub type SignalCallback = Box<dyn FnMut(&SignalEvent) + Send>;

struct Subscriber {
    id: SubscriptionId,
    /// `None` = every category
    categories: Option<Vec<SignalCategory>>,
    callback: SignalCallback,
}

impl Subscriber {
    fn accepts(&self, category: SignalCategory) -> bool {
        match &self.categories {
            Some(categories) => categories.contains(&category),
            None => true,
        }
    }
}

/// Fire-and-forget signal bus
pub struct SignalBus {
    subscribers: Vec<Subscriber>,
    next_id: u64,
    sequence: u64,
    clock_s: f64,
}

impl SignalBus {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 1,
            sequence: 0,
            clock_s: 0.0,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SUBSCRIPTIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Subscribe to every signal
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&SignalEvent) + Send + 'static,
    {
        self.add_subscriber(None, Box::new(callback))
    }

    /// Subscribe to a subset of categories
    pub fn subscribe_to<F>(&mut self, categories: &[SignalCategory], callback: F) -> SubscriptionId
    where
        F: FnMut(&SignalEvent) + Send + 'static,
    {
        self.add_subscriber(Some(categories.to_vec()), Box::new(callback))
    }

    fn add_subscriber(
        &mut self,
        categories: Option<Vec<SignalCategory>>,
        callback: SignalCallback,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber {
            id,
            categories,
            callback,
        });
        id
    }

    /// Remove a subscriber. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    /// Drop every subscriber
    pub fn clear(&mut self) {
        self.subscribers.clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EMISSION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Stamp and deliver a signal
    pub fn emit(&mut self, signal: Signal) {
        let event = SignalEvent::new(signal, self.clock_s, self.sequence);
        self.sequence += 1;

        log::trace!("signal {} @ {:.3}s", event.type_name(), event.timestamp_s);

        let category = event.signal.category();
        for subscriber in &mut self.subscribers {
            if subscriber.accepts(category) {
                (subscriber.callback)(&event);
            }
        }
    }

    /// Advance the timestamp applied to subsequent signals
    pub fn advance_clock(&mut self, dt: f32) {
        if dt > 0.0 {
            self.clock_s += dt as f64;
        }
    }

    /// Current bus time in seconds
    pub fn clock(&self) -> f64 {
        self.clock_s
    }

    /// Number of signals emitted so far
    pub fn emitted_count(&self) -> u64 {
        self.sequence
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalBus")
            .field("subscribers", &self.subscribers.len())
            .field("sequence", &self.sequence)
            .field("clock_s", &self.clock_s)
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDER
// ═══════════════════════════════════════════════════════════════════════════════

/// Shared buffer that records every delivered signal
///
/// Clone the recorder, hand one clone to the bus, keep the other to read.
#[derive(Debug, Clone, Default)]
pub struct SignalRecorder {
    events: Arc<Mutex<Vec<SignalEvent>>>,
    skip_high_frequency: bool,
}

impl SignalRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorder that drops per-tick timer updates
    pub fn without_timer_updates() -> Self {
        Self {
            events: Arc::default(),
            skip_high_frequency: true,
        }
    }

    /// Subscribe a clone of this recorder to the bus
    pub fn attach(&self, bus: &mut SignalBus) -> SubscriptionId {
        let sink = self.clone();
        bus.subscribe(move |event| sink.record(event))
    }

    fn record(&self, event: &SignalEvent) {
        if self.skip_high_frequency && event.signal.is_high_frequency() {
            return;
        }
        self.events.lock().push(event.clone());
    }

    /// Copy of everything recorded so far
    pub fn snapshot(&self) -> Vec<SignalEvent> {
        self.events.lock().clone()
    }

    /// Take everything recorded so far
    pub fn drain(&self) -> Vec<SignalEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Count recorded signals of a type
    pub fn count(&self, type_name: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.type_name() == type_name)
            .count()
    }

    /// Signals only, in order
    pub fn signals(&self) -> Vec<Signal> {
        self.events.lock().iter().map(|e| e.signal.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ff_core::{LaneId, ProductId};

    #[test]
    fn test_delivery_order_and_stamp() {
        let mut bus = SignalBus::new();
        let recorder = SignalRecorder::new();
        recorder.attach(&mut bus);

        bus.emit(Signal::WaveStarted { wave: 1 });
        bus.advance_clock(0.5);
        bus.emit(Signal::ScoreUpdated { total: 100 });

        let events = recorder.snapshot();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].sequence, 0);
        assert_eq!(events[1].sequence, 1);
        assert_eq!(events[0].timestamp_s, 0.0);
        assert_eq!(events[1].timestamp_s, 0.5);
        assert_eq!(bus.emitted_count(), 2);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut bus = SignalBus::new();
        let recorder = SignalRecorder::new();
        let id = recorder.attach(&mut bus);

        bus.emit(Signal::WaveStarted { wave: 1 });
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(Signal::WaveStarted { wave: 2 });

        assert_eq!(recorder.len(), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_category_filter() {
        let mut bus = SignalBus::new();
        let hits = Arc::new(Mutex::new(0usize));
        let counter = hits.clone();
        bus.subscribe_to(&[SignalCategory::Inspection], move |_| {
            *counter.lock() += 1;
        });

        bus.emit(Signal::WaveStarted { wave: 1 });
        bus.emit(Signal::ProductSelected {
            product: ProductId::new(1),
            lane: LaneId::new(0),
        });
        bus.emit(Signal::ScoreUpdated { total: 50 });

        assert_eq!(*hits.lock(), 1);
    }

    #[test]
    fn test_recorder_skips_timer_updates() {
        let mut bus = SignalBus::new();
        let recorder = SignalRecorder::without_timer_updates();
        recorder.attach(&mut bus);

        bus.emit(Signal::WaveTimerUpdated { normalized: 0.9 });
        bus.emit(Signal::WaveStarted { wave: 1 });

        assert_eq!(recorder.len(), 1);
        assert_eq!(recorder.count("wave_started"), 1);
        assert_eq!(recorder.drain().len(), 1);
        assert!(recorder.is_empty());
    }
}
