//! Structured append-only record of a run.

use ringsim_core::Notification;
use ringsim_messages::Message;
use ringsim_types::{NodeId, ProtocolViolation, SimTime};
use serde::{Deserialize, Serialize};

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogRecord {
    /// A message was accepted for delivery.
    Sent {
        message: Message,
        deliver_at: SimTime,
    },

    /// A message reached its recipient's inbox.
    Delivered { message: Message },

    /// A message was refused before scheduling.
    Dropped {
        message: Message,
        violation: ProtocolViolation,
    },

    /// A node reported a state change.
    Notified(Notification),
}

/// One log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Simulation time of the event.
    pub time: SimTime,
    /// Node the event belongs to (sender for `Sent` and `Dropped`).
    pub node: NodeId,
    pub record: LogRecord,
}

/// Every send, delivery and notification of a run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    entries: Vec<LogEntry>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn record(&mut self, time: SimTime, node: NodeId, record: LogRecord) {
        self.entries.push(LogEntry { time, node, record });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Delivered messages in delivery order, with their delivery time.
    pub fn deliveries(&self) -> impl Iterator<Item = (SimTime, &Message)> {
        self.entries.iter().filter_map(|entry| match &entry.record {
            LogRecord::Delivered { message } => Some((entry.time, message)),
            _ => None,
        })
    }
}
