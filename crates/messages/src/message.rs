//! Message envelope.

use crate::Payload;
use ringsim_types::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single protocol message.
///
/// Built once by a handler and never modified afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Node that produced the message.
    pub sender: NodeId,

    /// Node whose inbox receives it.
    pub recipient: NodeId,

    /// Message body.
    pub payload: Payload,
}

/// Discriminant of [`Payload`], for counting and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MessageKind {
    Connect,
    Redirect,
    ChangeNeighbour,
    NewNeighbour,
    SuccessJoin,
}

impl MessageKind {
    /// All kinds, in protocol order.
    pub const ALL: [MessageKind; 5] = [
        MessageKind::Connect,
        MessageKind::Redirect,
        MessageKind::ChangeNeighbour,
        MessageKind::NewNeighbour,
        MessageKind::SuccessJoin,
    ];

    /// Get a human-readable name for this message type.
    pub fn type_name(&self) -> &'static str {
        match self {
            MessageKind::Connect => "Connect",
            MessageKind::Redirect => "Redirect",
            MessageKind::ChangeNeighbour => "ChangeNeighbour",
            MessageKind::NewNeighbour => "NewNeighbour",
            MessageKind::SuccessJoin => "SuccessJoin",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

impl Message {
    /// Joiner `sender` asks `recipient` to let it in.
    pub fn connect(sender: NodeId, recipient: NodeId) -> Self {
        Self {
            sender,
            recipient,
            payload: Payload::Connect { subject: sender },
        }
    }

    /// Hand the join request of `subject` on to `recipient`.
    pub fn redirect(sender: NodeId, recipient: NodeId, subject: NodeId) -> Self {
        Self {
            sender,
            recipient,
            payload: Payload::Redirect { subject },
        }
    }

    /// Tell `recipient` to link to `announced`.
    pub fn change_neighbour(
        sender: NodeId,
        recipient: NodeId,
        subject: NodeId,
        announced: NodeId,
    ) -> Self {
        Self {
            sender,
            recipient,
            payload: Payload::ChangeNeighbour { subject, announced },
        }
    }

    /// Tell `recipient` that `announced` is now its neighbour.
    pub fn new_neighbour(
        sender: NodeId,
        recipient: NodeId,
        subject: NodeId,
        announced: NodeId,
    ) -> Self {
        Self {
            sender,
            recipient,
            payload: Payload::NewNeighbour { subject, announced },
        }
    }

    /// `sender` reports its own join as complete.
    pub fn success_join(sender: NodeId, recipient: NodeId) -> Self {
        Self {
            sender,
            recipient,
            payload: Payload::SuccessJoin { subject: sender },
        }
    }

    /// Kind of this message.
    pub fn kind(&self) -> MessageKind {
        match self.payload {
            Payload::Connect { .. } => MessageKind::Connect,
            Payload::Redirect { .. } => MessageKind::Redirect,
            Payload::ChangeNeighbour { .. } => MessageKind::ChangeNeighbour,
            Payload::NewNeighbour { .. } => MessageKind::NewNeighbour,
            Payload::SuccessJoin { .. } => MessageKind::SuccessJoin,
        }
    }

    /// Get a human-readable name for this message type.
    pub fn type_name(&self) -> &'static str {
        self.kind().type_name()
    }

    /// The joining node this message concerns.
    pub fn subject(&self) -> NodeId {
        self.payload.subject()
    }

    /// The announced neighbour, for the two splice messages.
    pub fn announced(&self) -> Option<NodeId> {
        self.payload.announced()
    }


    /// Every node id this message mentions.
    pub fn referenced_ids(&self) -> impl Iterator<Item = NodeId> {
        [
            Some(self.sender),
            Some(self.recipient),
            Some(self.subject()),
            self.announced(),
        ]
        .into_iter()
        .flatten()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({} -> {}, subject {}",
            self.type_name(),
            self.sender,
            self.recipient,
            self.subject()
        )?;
        if let Some(announced) = self.announced() {
            write!(f, ", announced {}", announced)?;
        }
        write!(f, ")")
    }
}
