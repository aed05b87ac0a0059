//! Cache state-change notifications.

use ordpool_types::TransactionBatch;
use std::sync::Arc;

/// Notifications published by the batch cache.
///
/// Events are **passive data** - they describe a transition that has already
/// committed. Delivery is synchronous, inside the critical section that
/// caused the transition, so per-batch event order matches transition order.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// A batch entered the pending store, or gained new signatures while
    /// remaining incomplete.
    StateUpdated(Arc<TransactionBatch>),

    /// A batch became fully signed and entered the available set. Also fired
    /// when a fully-signed batch arrives directly.
    Prepared(Arc<TransactionBatch>),
}

impl BatchEvent {
    /// The batch this event is about.
    pub fn batch(&self) -> &Arc<TransactionBatch> {
        match self {
            BatchEvent::StateUpdated(batch) | BatchEvent::Prepared(batch) => batch,
        }
    }
}

/// Receiver for cache notifications.
///
/// Injected per cache instance, so independent caches (tests, multiple
/// ordering lanes) do not share a sink. Implementations run inside the
/// cache's critical section: they must be trivially cheap or hand the event
/// off to their own executor, and they must never call back into the cache
/// on the delivering thread; the cache detects that and panics rather than
/// deadlocking.
pub trait EventSink: Send + Sync {
    /// Deliver one event.
    fn notify(&self, event: BatchEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn notify(&self, _event: BatchEvent) {}
}

/// Sink that records every event for later inspection.
///
/// Test support: scenario tests assert on the exact delivery sequence.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: parking_lot::Mutex<Vec<BatchEvent>>,
}

impl RecordingSink {
    /// Empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events delivered so far, in delivery order.
    pub fn events(&self) -> Vec<BatchEvent> {
        self.events.lock().clone()
    }

    /// Drain and return the events delivered so far.
    pub fn take(&self) -> Vec<BatchEvent> {
        std::mem::take(&mut self.events.lock())
    }
}

impl EventSink for RecordingSink {
    fn notify(&self, event: BatchEvent) {
        self.events.lock().push(event);
    }
}
