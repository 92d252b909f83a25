//! Error types for scenario construction and protocol handling.

use crate::{NodeId, Side};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors detected while building a scenario.
///
/// These are fatal: the scenario is rejected before any event runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Two nodes were given the same id.
    #[error("Duplicate node id: {0}")]
    DuplicateNodeId(NodeId),

    /// A ring needs at least three mutually linked nodes to start from.
    #[error("Bootstrap ring needs at least 3 nodes, got {count}")]
    TooFewBootstrapNodes { count: usize },

    /// Generated scenarios need room for the bootstrap ring.
    #[error("Node count must be at least 3, got {0}")]
    NodeCountTooSmall(u64),

    /// A joiner was bound to a contact that is not part of the bootstrap ring.
    #[error("Contact {contact} of {node} is not a bootstrap node")]
    UnknownContact { node: NodeId, contact: NodeId },

    /// Joiner ids must sit strictly inside the bootstrap id range.
    #[error("Joiner {node} is outside the bootstrap range ({min}, {max})")]
    JoinerOutOfRange {
        node: NodeId,
        min: NodeId,
        max: NodeId,
    },

    /// A node that still has to join was given no contact to join through.
    #[error("{0} is disconnected and has no contact to join through")]
    MissingContact(NodeId),

    /// Network delay bounds are inverted.
    #[error("Invalid delay range: min {min} > max {max}")]
    InvalidDelayRange { min: u64, max: u64 },

    /// Nodes must wait at least one tick between activations.
    #[error("Activation interval must be at least 1 tick")]
    InvalidActivationInterval,
}

/// A message or request the protocol cannot act on.
///
/// Never fatal: the offending message is dropped and reported.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ProtocolViolation {
    /// A message referenced an id that is not part of the node set.
    #[error("Message references unknown node {0}")]
    UnknownNode(NodeId),

    /// An insertion needed a neighbour slot that is empty.
    #[error("{node} has no {side} neighbour to splice against")]
    MissingNeighbour { node: NodeId, side: Side },

    /// A join request collides with the handling node or one of its neighbours.
    #[error("Join request for {subject} collides with an existing member of {node}'s neighbourhood")]
    DuplicateJoin { node: NodeId, subject: NodeId },

    /// A node was told to link to itself.
    #[error("{0} was announced as its own neighbour")]
    SelfAnnouncement(NodeId),

    /// A disconnected node has no bootstrap contact to ask.
    #[error("{0} has no bootstrap contact")]
    NoContact(NodeId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ConfigError::JoinerOutOfRange {
            node: NodeId(60),
            min: NodeId(1),
            max: NodeId(50),
        };
        assert_eq!(
            err.to_string(),
            "Joiner Node(60) is outside the bootstrap range (Node(1), Node(50))"
        );

        let violation = ProtocolViolation::MissingNeighbour {
            node: NodeId(2),
            side: Side::Left,
        };
        assert_eq!(
            violation.to_string(),
            "Node(2) has no left neighbour to splice against"
        );
    }
}
