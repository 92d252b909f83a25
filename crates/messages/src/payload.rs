//! Message bodies.

use ringsim_types::NodeId;
use serde::{Deserialize, Serialize};

/// What a message asks its recipient to do.
///
/// `subject` is always the node whose join the message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// A joiner asks its bootstrap contact to be let into the ring.
    Connect { subject: NodeId },

    /// A join request handed on toward the joiner's position.
    Redirect { subject: NodeId },

    /// The recipient should link to `announced` on the matching side.
    ChangeNeighbour { subject: NodeId, announced: NodeId },

    /// `announced` (usually the sender) is now the recipient's neighbour.
    NewNeighbour { subject: NodeId, announced: NodeId },

    /// `subject` has linked on both sides.
    SuccessJoin { subject: NodeId },
}

impl Payload {
    /// The joining node this payload concerns.
    pub fn subject(&self) -> NodeId {
        match *self {
            Payload::Connect { subject }
            | Payload::Redirect { subject }
            | Payload::ChangeNeighbour { subject, .. }
            | Payload::NewNeighbour { subject, .. }
            | Payload::SuccessJoin { subject } => subject,
        }
    }

    /// The announced neighbour, for the two splice messages.
    pub fn announced(&self) -> Option<NodeId> {
        match *self {
            Payload::ChangeNeighbour { announced, .. } | Payload::NewNeighbour { announced, .. } => {
                Some(announced)
            }
            _ => None,
        }
    }
}
