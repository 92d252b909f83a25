//! Topology and protocol invariants.
//!
//! Checks run after (or during) a simulation against the nodes and the event
//! log. Each returns every violation found rather than stopping at the first.

use crate::coordinator::RingCoordinator;
use ringsim_core::Notification;
use ringsim_messages::Payload;
use ringsim_simulation::{EventLog, LogRecord};
use ringsim_types::{NodeId, SimTime};
use std::collections::BTreeMap;
use thiserror::Error;

/// A broken invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// A connected node is missing a neighbour.
    #[error("{0} is connected without both neighbours")]
    HalfJoined(NodeId),

    /// `node.right = right` but `right.left != node`.
    #[error("{node} points right at {right}, whose left is {back:?}")]
    NotMutual {
        node: NodeId,
        right: NodeId,
        back: Option<NodeId>,
    },

    /// The ring does not visit every connected node in ascending order.
    #[error("Ring is not a single ascending cycle: {walk:?}")]
    NotAscendingCycle { walk: Vec<NodeId> },

    /// A node acquired its join lock while already holding it.
    #[error("{node} locked for {subject} at {at} while holding it for {held_for}")]
    LockOverlap {
        node: NodeId,
        subject: NodeId,
        held_for: NodeId,
        at: SimTime,
    },

    /// A join request was handed on too many times.
    #[error("Join of {subject} was redirected {hops} times (limit {limit})")]
    TooManyRedirects {
        subject: NodeId,
        hops: usize,
        limit: usize,
    },
}

/// One period during which a node held its join lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockInterval {
    /// Join the lock was held for.
    pub subject: NodeId,
    pub acquired: SimTime,
    /// `None` if still held when the log ends.
    pub released: Option<SimTime>,
}

/// Runs the invariant checks.
pub struct InvariantChecker;

impl InvariantChecker {
    /// Every check that holds at any point of a run.
    pub fn check_running(coordinator: &RingCoordinator) -> Vec<InvariantViolation> {
        let mut violations = Self::connected_have_neighbours(coordinator);
        violations.extend(Self::locks_are_disjoint(coordinator.event_log()));
        violations.extend(Self::redirects_are_bounded(
            coordinator.event_log(),
            coordinator.runner().node_count(),
        ));
        violations
    }

    /// Every check, including those that only hold once all joins are done.
    pub fn check_settled(coordinator: &RingCoordinator) -> Vec<InvariantViolation> {
        let mut violations = Self::check_running(coordinator);
        violations.extend(Self::links_are_mutual(coordinator));
        violations.extend(Self::ring_is_ascending_cycle(coordinator));
        violations
    }

    /// Connected implies both neighbours set.
    pub fn connected_have_neighbours(coordinator: &RingCoordinator) -> Vec<InvariantViolation> {
        coordinator
            .nodes()
            .filter(|node| node.state().is_connected() && !node.neighbours().is_complete())
            .map(|node| InvariantViolation::HalfJoined(node.id()))
            .collect()
    }

    /// Every right link is matched by a left link.
    pub fn links_are_mutual(coordinator: &RingCoordinator) -> Vec<InvariantViolation> {
        coordinator
            .nodes()
            .filter_map(|node| {
                let right = node.right()?;
                let back = coordinator.node(right).and_then(|r| r.left());
                (back != Some(node.id())).then_some(InvariantViolation::NotMutual {
                    node: node.id(),
                    right,
                    back,
                })
            })
            .collect()
    }

    /// N right hops from the smallest node visit every node in ascending
    /// order and return to the start.
    pub fn ring_is_ascending_cycle(coordinator: &RingCoordinator) -> Vec<InvariantViolation> {
        let Some(start) = coordinator.nodes().next().map(|node| node.id()) else {
            return Vec::new();
        };
        let walk = coordinator.traverse_from(start);
        let all: Vec<NodeId> = coordinator.nodes().map(|node| node.id()).collect();

        if walk.closed && walk.nodes == all {
            Vec::new()
        } else {
            vec![InvariantViolation::NotAscendingCycle { walk: walk.nodes }]
        }
    }

    /// Lock periods per node, in order, from the event log.
    pub fn lock_intervals(log: &EventLog) -> BTreeMap<NodeId, Vec<LockInterval>> {
        let mut intervals: BTreeMap<NodeId, Vec<LockInterval>> = BTreeMap::new();
        for entry in log.entries() {
            match &entry.record {
                LogRecord::Notified(Notification::JoinLockAcquired { subject }) => {
                    intervals.entry(entry.node).or_default().push(LockInterval {
                        subject: *subject,
                        acquired: entry.time,
                        released: None,
                    });
                }
                LogRecord::Notified(Notification::JoinLockReleased { subject }) => {
                    if let Some(open) = intervals
                        .get_mut(&entry.node)
                        .and_then(|list| list.last_mut())
                        .filter(|interval| {
                            interval.released.is_none() && interval.subject == *subject
                        })
                    {
                        open.released = Some(entry.time);
                    }
                }
                _ => {}
            }
        }
        intervals
    }

    /// No node takes its lock again before releasing it.
    pub fn locks_are_disjoint(log: &EventLog) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();
        for (node, intervals) in Self::lock_intervals(log) {
            for pair in intervals.windows(2) {
                let (earlier, later) = (pair[0], pair[1]);
                let overlaps = match earlier.released {
                    None => true,
                    Some(released) => later.acquired < released,
                };
                if overlaps {
                    violations.push(InvariantViolation::LockOverlap {
                        node,
                        subject: later.subject,
                        held_for: earlier.subject,
                        at: later.acquired,
                    });
                }
            }
        }
        violations
    }

    /// Redirects sent per joining node.
    pub fn redirect_hops(log: &EventLog) -> BTreeMap<NodeId, usize> {
        let mut hops: BTreeMap<NodeId, usize> = BTreeMap::new();
        for entry in log.entries() {
            if let LogRecord::Sent { message, .. } = &entry.record {
                if let Payload::Redirect { subject } = message.payload {
                    *hops.entry(subject).or_default() += 1;
                }
            }
        }
        hops
    }

    /// No join is redirected more than `node_count - 1` times.
    pub fn redirects_are_bounded(log: &EventLog, node_count: usize) -> Vec<InvariantViolation> {
        let limit = node_count.saturating_sub(1);
        Self::redirect_hops(log)
            .into_iter()
            .filter(|&(_, hops)| hops > limit)
            .map(|(subject, hops)| InvariantViolation::TooManyRedirects {
                subject,
                hops,
                limit,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringsim_messages::Message;

    fn lock(log: &mut EventLog, time: u64, node: u64, subject: u64, acquire: bool) {
        let subject = NodeId(subject);
        let notification = if acquire {
            Notification::JoinLockAcquired { subject }
        } else {
            Notification::JoinLockReleased { subject }
        };
        log.record(SimTime(time), NodeId(node), LogRecord::Notified(notification));
    }

    #[test]
    fn test_lock_intervals_pair_up() {
        let mut log = EventLog::new();
        lock(&mut log, 5, 1, 2, true);
        lock(&mut log, 20, 1, 2, false);
        lock(&mut log, 21, 1, 3, true);

        let intervals = InvariantChecker::lock_intervals(&log);
        assert_eq!(
            intervals[&NodeId(1)],
            vec![
                LockInterval {
                    subject: NodeId(2),
                    acquired: SimTime(5),
                    released: Some(SimTime(20)),
                },
                LockInterval {
                    subject: NodeId(3),
                    acquired: SimTime(21),
                    released: None,
                },
            ]
        );
        assert!(InvariantChecker::locks_are_disjoint(&log).is_empty());
    }

    #[test]
    fn test_overlapping_lock_detected() {
        let mut log = EventLog::new();
        lock(&mut log, 5, 1, 2, true);
        lock(&mut log, 8, 1, 3, true);

        assert_eq!(
            InvariantChecker::locks_are_disjoint(&log),
            vec![InvariantViolation::LockOverlap {
                node: NodeId(1),
                subject: NodeId(3),
                held_for: NodeId(2),
                at: SimTime(8),
            }]
        );
    }

    #[test]
    fn test_redirect_bound() {
        let mut log = EventLog::new();
        for (from, to) in [(1, 49), (49, 50), (50, 1)] {
            log.record(
                SimTime(1),
                NodeId(from),
                LogRecord::Sent {
                    message: Message::redirect(NodeId(from), NodeId(to), NodeId(7)),
                    deliver_at: SimTime(2),
                },
            );
        }

        assert_eq!(InvariantChecker::redirect_hops(&log)[&NodeId(7)], 3);
        assert!(InvariantChecker::redirects_are_bounded(&log, 4).is_empty());
        assert_eq!(
            InvariantChecker::redirects_are_bounded(&log, 3),
            vec![InvariantViolation::TooManyRedirects {
                subject: NodeId(7),
                hops: 3,
                limit: 2,
            }]
        );
    }
}
