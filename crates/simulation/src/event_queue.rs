//! Time-ordered event queue.

use ringsim_core::Event;
use ringsim_types::{NodeId, SimTime};
use std::collections::BTreeMap;

/// Position of an event in the queue.
///
/// Ordered by time, then by submission order, so events due at the same tick
/// fire first-in first-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    /// When the event fires.
    pub time: SimTime,
    /// Submission counter.
    pub sequence: u64,
}

impl EventKey {
    pub fn new(time: SimTime, sequence: u64) -> Self {
        Self { time, sequence }
    }
}

/// An event bound for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledEvent {
    pub target: NodeId,
    pub event: Event,
}

/// Pending events, earliest first.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: BTreeMap<EventKey, ScheduledEvent>,
    sequence: u64,
    deliveries: usize,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `event` for `target` at `time`.
    pub fn schedule(&mut self, time: SimTime, target: NodeId, event: Event) -> EventKey {
        self.sequence += 1;
        let key = EventKey::new(time, self.sequence);
        if event.is_delivery() {
            self.deliveries += 1;
        }
        self.events.insert(key, ScheduledEvent { target, event });
        key
    }

    /// Remove the earliest event.
    pub fn pop_next(&mut self) -> Option<(EventKey, ScheduledEvent)> {
        let (key, scheduled) = self.events.pop_first()?;
        if scheduled.event.is_delivery() {
            self.deliveries -= 1;
        }
        Some((key, scheduled))
    }

    /// Fire time of the earliest event.
    pub fn peek_time(&self) -> Option<SimTime> {
        self.events.first_key_value().map(|(key, _)| key.time)
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of queued message deliveries.
    pub fn pending_deliveries(&self) -> usize {
        self.deliveries
    }
}
