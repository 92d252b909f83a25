//! Core types for the ring membership simulation.
//!
//! Everything here is plain data: identifiers, the simulated clock, node
//! lifecycle states and the error taxonomy shared by every other crate.

mod error;
mod identifiers;
mod state;

pub use error::{ConfigError, ProtocolViolation};
pub use identifiers::{NodeId, SimTime};
pub use state::{NodeState, Side};
