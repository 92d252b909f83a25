//! Core abstractions shared by ring nodes and the simulation runner.
//!
//! A node is a synchronous state machine: the runner feeds it [`Event`]s and
//! carries out the [`Action`]s it returns. Nodes never touch each other's
//! state; everything crosses node boundaries as a message.

mod action;
mod event;
mod notification;
mod traits;

pub use action::Action;
pub use event::Event;
pub use notification::Notification;
pub use traits::StateMachine;
