//! Ring node state machine.
//!
//! A [`RingNode`] owns its two neighbour slots and is the only thing that
//! ever writes them. Joins arriving at a node are queued and served one at a
//! time under a single-slot join lock.

mod neighbours;
mod state;

pub use neighbours::Neighbours;
pub use state::RingNode;
