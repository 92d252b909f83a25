//! Domain-specific identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ring participant identifier.
///
/// Ids are totally ordered and double as ring positions: a node's right
/// neighbour is the next larger id, wrapping from the largest id back to the
/// smallest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Distance travelled from `self` to `to` following right links around
    /// the identifier circle.
    pub fn clockwise_distance(self, to: NodeId) -> u64 {
        to.0.wrapping_sub(self.0)
    }

    /// Distance travelled from `self` to `to` following left links.
    pub fn counter_clockwise_distance(self, to: NodeId) -> u64 {
        self.0.wrapping_sub(to.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        NodeId(id)
    }
}

/// Simulated time, in ticks.
///
/// The clock starts at zero and is only ever advanced by the scheduler.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SimTime(pub u64);

impl SimTime {
    /// Start of every simulation.
    pub const ZERO: Self = SimTime(0);

    /// The time `delay` ticks after this one.
    pub fn after(self, delay: u64) -> Self {
        SimTime(self.0.saturating_add(delay))
    }

    /// Ticks elapsed since `earlier` (zero if `earlier` is in the future).
    pub fn since(self, earlier: SimTime) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={}", self.0)
    }
}
