//! Messages exchanged by ring nodes during a join.
//!
//! A join is driven by five message kinds:
//!
//! ```text
//!   joiner ──Connect──▶ contact ──Redirect──▶ … ──Redirect──▶ inserter
//!                                                                │
//!            ┌──────────────ChangeNeighbour──────────────────────┤
//!            ▼                                                   ▼
//!     displaced node ──NewNeighbour──▶ joiner ◀──NewNeighbour── inserter
//!                                        │
//!                                        └──SuccessJoin──▶ neighbours
//! ```

mod message;
mod payload;

pub use message::{Message, MessageKind};
pub use payload::Payload;
