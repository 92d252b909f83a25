//! Node lifecycle and ring orientation.

use crate::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a ring participant.
///
/// Transitions only move forward:
/// `Disconnected -> AwaitingConnection -> Connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeState {
    /// Created with a bootstrap contact, has not yet asked to join.
    Disconnected,
    /// Join request sent, waiting for both neighbours to be announced.
    AwaitingConnection,
    /// Linked on both sides. Terminal.
    Connected,
}

impl NodeState {
    /// Whether the node is part of the ring.
    pub fn is_connected(&self) -> bool {
        matches!(self, NodeState::Connected)
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeState::Disconnected => write!(f, "Disconnected"),
            NodeState::AwaitingConnection => write!(f, "AwaitingConnection"),
            NodeState::Connected => write!(f, "Connected"),
        }
    }
}

/// Which of a node's two neighbour slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Predecessor (next smaller id).
    Left,
    /// Successor (next larger id).
    Right,
}

impl Side {
    /// The slot of `own` that should point at `other`.
    ///
    /// Ids compare linearly: a larger id belongs on the right.
    pub fn toward(own: NodeId, other: NodeId) -> Side {
        if other > own {
            Side::Right
        } else {
            Side::Left
        }
    }

    /// Distance from `from` to `to` walking in this direction.
    pub fn distance(self, from: NodeId, to: NodeId) -> u64 {
        match self {
            Side::Right => from.clockwise_distance(to),
            Side::Left => from.counter_clockwise_distance(to),
        }
    }

    /// Whether `candidate` would be a strictly nearer neighbour of `own` on
    /// this side than `current`.
    pub fn is_nearer(self, own: NodeId, candidate: NodeId, current: NodeId) -> bool {
        self.distance(own, candidate) < self.distance(own, current)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}
