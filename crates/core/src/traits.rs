//! Core traits for state machines.

use crate::{Action, Event};
use ringsim_types::SimTime;

/// A state machine that processes events.
///
/// Every ring node is implemented as a state machine that is:
///
/// - **Synchronous**: No async, no `.await`
/// - **Deterministic**: Same state + event = same actions
/// - **Pure-ish**: Mutates self, but performs no I/O
///
/// # Example
///
/// ```ignore
/// impl StateMachine for RingNode {
///     fn handle(&mut self, event: Event) -> Vec<Action> {
///         match event {
///             Event::Activate => self.on_activate(),
///             Event::MessageReceived { message } => {
///                 self.inbox.push_back(message);
///                 vec![]
///             }
///         }
///     }
///
///     fn set_time(&mut self, now: SimTime) {
///         self.now = now;
///     }
/// }
/// ```
pub trait StateMachine {
    /// Process an event, returning actions to perform.
    ///
    /// # Guarantees
    ///
    /// - **Synchronous**: This method never blocks or awaits
    /// - **Deterministic**: Given the same state and event, always returns the same actions
    /// - **No I/O**: Message delivery is performed by the runner via the returned actions
    fn handle(&mut self, event: Event) -> Vec<Action>;

    /// Set the current time.
    ///
    /// Called by the runner before each `handle()` call.
    fn set_time(&mut self, now: SimTime);

    /// Get the current time.
    ///
    /// Returns the time that was last set via `set_time()`.
    fn now(&self) -> SimTime;
}
