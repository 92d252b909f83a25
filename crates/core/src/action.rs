//! Outputs of a node state machine.

use crate::Notification;
use ringsim_messages::Message;

/// Work the runner performs on behalf of a node.
///
/// Actions are executed in the order they are returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Deliver a message to another node after a network delay.
    Send { message: Message },

    /// Report a state change for logging and inspection.
    Emit(Notification),
}

impl Action {
    /// Get a human-readable name for this action type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::Send { .. } => "Send",
            Action::Emit(_) => "Emit",
        }
    }
}
