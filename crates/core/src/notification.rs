//! Observable node state changes.

use ringsim_types::{NodeId, NodeState, ProtocolViolation, Side};
use serde::{Deserialize, Serialize};

/// A state change a node reports to the runner.
///
/// Notifications have no effect on other nodes. The runner records them in
/// the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    /// Lifecycle transition.
    StateChanged { from: NodeState, to: NodeState },

    /// A neighbour slot was rewritten.
    NeighbourChanged {
        side: Side,
        previous: Option<NodeId>,
        current: NodeId,
    },

    /// A join request was moved from the inbox to the pending queue.
    JoinQueued { subject: NodeId },

    /// The join lock was taken on behalf of `subject`.
    JoinLockAcquired { subject: NodeId },

    /// The join lock held for `subject` was released.
    JoinLockReleased { subject: NodeId },

    /// The join request of `subject` was handed on to `to`.
    Redirected { subject: NodeId, to: NodeId },

    /// A message or request was dropped.
    ProtocolViolation(ProtocolViolation),
}

impl Notification {
    /// Get a human-readable name for this notification type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Notification::StateChanged { .. } => "StateChanged",
            Notification::NeighbourChanged { .. } => "NeighbourChanged",
            Notification::JoinQueued { .. } => "JoinQueued",
            Notification::JoinLockAcquired { .. } => "JoinLockAcquired",
            Notification::JoinLockReleased { .. } => "JoinLockReleased",
            Notification::Redirected { .. } => "Redirected",
            Notification::ProtocolViolation(_) => "ProtocolViolation",
        }
    }
}
