//! Deterministic simulation runner.
//!
//! This crate provides a fully deterministic discrete-event environment for
//! ring nodes. Given the same seed, it produces identical results every run.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SimulationRunner                       │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     EventQueue (BTreeMap<EventKey, Scheduled>)     │ │
//! │  │     Ordered by: time, sequence                     │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     nodes: BTreeMap<NodeId, RingNode>              │ │
//! │  │     Deliveries fill inboxes, activations drain     │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Actions → delayed deliveries + EventLog        │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod event_log;
mod event_queue;
mod network;
mod runner;

pub use event_log::{EventLog, LogEntry, LogRecord};
pub use event_queue::{EventKey, EventQueue, ScheduledEvent};
pub use network::{NetworkConfig, SimulatedNetwork};
pub use runner::{SimulationRunner, SimulationStats};
