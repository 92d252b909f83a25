//! Inputs to a node state machine.

use ringsim_messages::Message;

/// Something that happened to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The node's recurring activity is due.
    ///
    /// This is the only point at which a node acts on its inbox.
    Activate,

    /// A message arrived and should be appended to the inbox.
    MessageReceived { message: Message },
}

impl Event {
    /// Get a human-readable name for this event type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::Activate => "Activate",
            Event::MessageReceived { .. } => "MessageReceived",
        }
    }

    /// Check if this event carries a message delivery.
    pub fn is_delivery(&self) -> bool {
        matches!(self, Event::MessageReceived { .. })
    }
}
