//! Deterministic simulation runner.
//!
//! Deliveries only append to a node's inbox. Nodes act on their inbox during
//! their own recurring activation, which the runner reschedules after every
//! run of the handler.

use crate::event_log::{EventLog, LogRecord};
use crate::event_queue::{EventKey, EventQueue};
use crate::network::{NetworkConfig, SimulatedNetwork};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use ringsim_core::{Action, Event, Notification, StateMachine};
use ringsim_messages::{Message, MessageKind};
use ringsim_node::RingNode;
use ringsim_types::{ConfigError, NodeId, NodeState, ProtocolViolation, SimTime};
use std::collections::BTreeMap;
use tracing::{debug, info, trace, warn};

/// Deterministic simulation runner.
///
/// Processes events in deterministic order and executes actions.
/// Given the same seed, produces identical results every run.
pub struct SimulationRunner {
    /// All nodes in the simulation, by id.
    nodes: BTreeMap<NodeId, RingNode>,

    /// Global event queue, ordered deterministically.
    event_queue: EventQueue,

    /// Current simulation time.
    now: SimTime,

    /// Network simulator.
    network: SimulatedNetwork,

    /// RNG for message delays (seeded for determinism).
    rng: ChaCha8Rng,

    /// Statistics.
    stats: SimulationStats,

    /// Structured record of the run.
    log: EventLog,
}

/// Statistics collected during simulation.
#[derive(Debug, Default, Clone)]
pub struct SimulationStats {
    /// Total events processed.
    pub events_processed: u64,
    /// Node activations run.
    pub activations: u64,
    /// Total actions generated.
    pub actions_generated: u64,
    /// Messages sent (successfully scheduled for delivery).
    pub messages_sent: u64,
    /// Messages that reached an inbox.
    pub messages_delivered: u64,
    /// Messages dropped because they named a node outside the simulation.
    pub messages_dropped_unknown: u64,
    /// Protocol violations reported by nodes.
    pub protocol_violations: u64,
    /// Messages sent, by kind.
    pub sent_by_kind: BTreeMap<MessageKind, u64>,
}

impl SimulationStats {
    /// Messages of one kind sent so far.
    pub fn sent_of(&self, kind: MessageKind) -> u64 {
        self.sent_by_kind.get(&kind).copied().unwrap_or(0)
    }

    /// Messages scheduled but not yet delivered.
    pub fn messages_in_flight(&self) -> u64 {
        self.messages_sent - self.messages_delivered
    }
}

impl SimulationRunner {
    /// Create an empty runner.
    pub fn new(network_config: NetworkConfig, seed: u64) -> Result<Self, ConfigError> {
        let network = SimulatedNetwork::new(network_config)?;

        info!(
            seed,
            min_delay = network.config().min_delay,
            max_delay = network.config().max_delay,
            sequential_sends = network.config().sequential_sends,
            "Created simulation runner"
        );

        Ok(Self {
            nodes: BTreeMap::new(),
            event_queue: EventQueue::new(),
            now: SimTime::ZERO,
            network,
            rng: ChaCha8Rng::seed_from_u64(seed),
            stats: SimulationStats::default(),
            log: EventLog::new(),
        })
    }

    /// Add a node and register its recurring activation, first due now.
    pub fn add_node(&mut self, node: RingNode) -> Result<(), ConfigError> {
        let id = node.id();
        if self.nodes.contains_key(&id) {
            return Err(ConfigError::DuplicateNodeId(id));
        }
        if node.state() == NodeState::Disconnected && node.contact().is_none() {
            return Err(ConfigError::MissingContact(id));
        }

        trace!(node = %id, state = %node.state(), "Adding node");
        self.nodes.insert(id, node);
        self.event_queue.schedule(self.now, id, Event::Activate);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════════

    /// Get simulation statistics.
    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Get current simulation time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Get a reference to a node by id.
    pub fn node(&self, id: NodeId) -> Option<&RingNode> {
        self.nodes.get(&id)
    }

    /// All nodes, in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &RingNode> {
        self.nodes.values()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The record of everything that happened so far.
    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    /// Queued events, including recurring activations.
    pub fn pending_events(&self) -> usize {
        self.event_queue.len()
    }

    /// Every node connected and idle, and no message in flight.
    pub fn is_settled(&self) -> bool {
        self.event_queue.pending_deliveries() == 0 && self.nodes.values().all(RingNode::is_settled)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Driving
    // ═══════════════════════════════════════════════════════════════════════════

    /// Schedule delivery of `message` to its recipient `delay` ticks from now.
    ///
    /// Returns `None` if the message names a node outside the simulation; it
    /// is then dropped and logged.
    pub fn schedule(&mut self, delay: u64, message: Message) -> Option<EventKey> {
        let at = self.now.after(delay);
        self.enqueue(message, at)
    }

    /// Process the earliest event. Returns `false` if the queue is empty.
    pub fn step(&mut self) -> bool {
        let Some((key, scheduled)) = self.event_queue.pop_next() else {
            return false;
        };
        self.now = key.time;
        self.stats.events_processed += 1;

        trace!(
            time = %self.now,
            node = %scheduled.target,
            event = scheduled.event.type_name(),
            "Processing event"
        );

        match scheduled.event {
            Event::Activate => self.activate(scheduled.target),
            Event::MessageReceived { message } => self.deliver(scheduled.target, message),
        }
        true
    }

    /// Run simulation until no more events or time limit reached.
    pub fn run_until(&mut self, end_time: SimTime) {
        while let Some(time) = self.event_queue.peek_time() {
            if time > end_time {
                debug!(
                    remaining_events = self.event_queue.len(),
                    "Time limit reached"
                );
                break;
            }
            self.step();
        }

        // Always advance time to end_time, even if we ran out of events.
        if self.now < end_time {
            self.now = end_time;
        }

        trace!(
            events_processed = self.stats.events_processed,
            messages_sent = self.stats.messages_sent,
            final_time = %self.now,
            "Simulation step complete"
        );
    }

    /// Run until every join has completed or `limit` is passed.
    ///
    /// Returns whether the simulation settled.
    pub fn run_until_settled(&mut self, limit: SimTime) -> bool {
        loop {
            if self.is_settled() {
                info!(time = %self.now, events = self.stats.events_processed, "Simulation settled");
                return true;
            }
            match self.event_queue.peek_time() {
                Some(time) if time <= limit => {
                    self.step();
                }
                _ => {
                    warn!(
                        time = %self.now,
                        limit = %limit,
                        "Simulation did not settle before the limit"
                    );
                    return false;
                }
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Event Processing
    // ═══════════════════════════════════════════════════════════════════════════

    fn activate(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(&id) else {
            warn!(node = %id, "Activation for unknown node");
            return;
        };
        node.set_time(self.now);
        let actions = node.handle(Event::Activate);

        self.stats.activations += 1;
        self.stats.actions_generated += actions.len() as u64;

        // With sequential sends the node is suspended until each send lands.
        let sequential = self.network.config().sequential_sends;
        let mut busy_until = self.now;
        for action in actions {
            trace!(node = %id, action = action.type_name(), "Executing action");
            match action {
                Action::Send { message } => {
                    let delay = self.network.sample_delay(&mut self.rng);
                    let from = if sequential { busy_until } else { self.now };
                    let at = from.after(delay);
                    if self.enqueue(message, at).is_some() && sequential {
                        busy_until = at;
                    }
                }
                Action::Emit(notification) => self.notify(id, notification),
            }
        }

        let next = busy_until.after(self.network.config().activation_interval);
        self.event_queue.schedule(next, id, Event::Activate);
    }

    fn deliver(&mut self, id: NodeId, message: Message) {
        let Some(node) = self.nodes.get_mut(&id) else {
            warn!(node = %id, "Delivery to unknown node");
            return;
        };
        node.set_time(self.now);
        node.handle(Event::MessageReceived { message });

        self.stats.messages_delivered += 1;
        self.log.record(self.now, id, LogRecord::Delivered { message });
    }

    /// Schedule a delivery at `at` after checking every id the message names.
    fn enqueue(&mut self, message: Message, at: SimTime) -> Option<EventKey> {
        if let Some(unknown) = message
            .referenced_ids()
            .find(|id| !self.nodes.contains_key(id))
        {
            let violation = ProtocolViolation::UnknownNode(unknown);
            warn!(message = %message, %violation, "Dropping message that references an unknown node");
            self.stats.messages_dropped_unknown += 1;
            self.log.record(
                self.now,
                message.sender,
                LogRecord::Dropped { message, violation },
            );
            return None;
        }

        let key = self
            .event_queue
            .schedule(at, message.recipient, Event::MessageReceived { message });

        self.stats.messages_sent += 1;
        *self.stats.sent_by_kind.entry(message.kind()).or_default() += 1;
        self.log.record(
            self.now,
            message.sender,
            LogRecord::Sent {
                message,
                deliver_at: at,
            },
        );
        Some(key)
    }

    fn notify(&mut self, id: NodeId, notification: Notification) {
        trace!(
            node = %id,
            notification = notification.type_name(),
            time = %self.now,
            "Node notification"
        );
        match &notification {
            Notification::ProtocolViolation(_) => self.stats.protocol_violations += 1,
            Notification::StateChanged { to, .. } if to.is_connected() => {
                debug!(node = %id, time = %self.now, "Node connected");
            }
            _ => {}
        }
        self.log.record(self.now, id, LogRecord::Notified(notification));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogEntry;
    use tracing_test::traced_test;

    fn bootstrap_ring(runner: &mut SimulationRunner) {
        runner
            .add_node(RingNode::bootstrap(NodeId(1), NodeId(50), NodeId(49)))
            .unwrap();
        runner
            .add_node(RingNode::bootstrap(NodeId(49), NodeId(1), NodeId(50)))
            .unwrap();
        runner
            .add_node(RingNode::bootstrap(NodeId(50), NodeId(49), NodeId(1)))
            .unwrap();
    }

    fn sends_from(log: &EventLog, node: NodeId) -> Vec<(SimTime, Message, SimTime)> {
        log.entries()
            .iter()
            .filter(|entry| entry.node == node)
            .filter_map(|entry| match entry.record {
                LogRecord::Sent {
                    message,
                    deliver_at,
                } => Some((entry.time, message, deliver_at)),
                _ => None,
            })
            .collect()
    }

    #[traced_test]
    #[test]
    fn test_activations_recur_every_interval() {
        let mut runner = SimulationRunner::new(NetworkConfig::default(), 1).unwrap();
        bootstrap_ring(&mut runner);

        runner.run_until(SimTime(5));

        // Ticks 0..=5 for each of the three nodes.
        assert_eq!(runner.stats().activations, 18);
        assert_eq!(runner.stats().messages_sent, 0);
        assert_eq!(runner.now(), SimTime(5));
        assert_eq!(runner.pending_events(), 3);
        assert!(runner.is_settled());
    }

    #[traced_test]
    #[test]
    fn test_duplicate_node_rejected() {
        let mut runner = SimulationRunner::new(NetworkConfig::default(), 1).unwrap();
        bootstrap_ring(&mut runner);

        let err = runner
            .add_node(RingNode::joiner(NodeId(49), NodeId(1)))
            .unwrap_err();
        assert_eq!(err, ConfigError::DuplicateNodeId(NodeId(49)));
        assert_eq!(runner.node_count(), 3);
    }

    #[traced_test]
    #[test]
    fn test_invalid_network_rejected() {
        let result = SimulationRunner::new(NetworkConfig::default().with_delay_range(3, 1), 1);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidDelayRange { min: 3, max: 1 })
        ));
    }

    #[traced_test]
    #[test]
    fn test_schedule_delivers_into_inbox() {
        let mut runner = SimulationRunner::new(NetworkConfig::default(), 1).unwrap();
        bootstrap_ring(&mut runner);

        let message = Message::success_join(NodeId(1), NodeId(49));
        assert!(runner.schedule(3, message).is_some());
        assert_eq!(runner.stats().messages_in_flight(), 1);
        assert!(!runner.is_settled());

        runner.run_until(SimTime(3));

        assert_eq!(runner.stats().messages_delivered, 1);
        assert_eq!(
            runner.event_log().deliveries().collect::<Vec<_>>(),
            vec![(SimTime(3), &message)]
        );
        assert!(runner.is_settled());
    }

    #[traced_test]
    #[test]
    fn test_unknown_recipient_is_dropped() {
        let mut runner = SimulationRunner::new(NetworkConfig::default(), 1).unwrap();
        bootstrap_ring(&mut runner);

        let message = Message::connect(NodeId(1), NodeId(99));
        assert!(runner.schedule(2, message).is_none());

        assert_eq!(runner.stats().messages_dropped_unknown, 1);
        assert_eq!(runner.stats().messages_sent, 0);
        assert_eq!(
            runner.event_log().entries(),
            &[LogEntry {
                time: SimTime::ZERO,
                node: NodeId(1),
                record: LogRecord::Dropped {
                    message,
                    violation: ProtocolViolation::UnknownNode(NodeId(99)),
                },
            }]
        );
        assert!(logs_contain("unknown node"));

        // The simulation carries on.
        runner.run_until(SimTime(10));
        assert!(runner.is_settled());
    }

    #[traced_test]
    #[test]
    fn test_sequential_sends_accumulate_delay() {
        let network = NetworkConfig::default().with_fixed_delay(5);
        let mut runner = SimulationRunner::new(network, 1).unwrap();
        bootstrap_ring(&mut runner);
        runner
            .add_node(RingNode::joiner(NodeId(2), NodeId(1)))
            .unwrap();

        runner.run_until(SimTime(5));

        // Connect leaves at 0 and lands at 5; node 1 serves it at 5 and its two
        // splice messages go out back to back.
        assert_eq!(
            sends_from(runner.event_log(), NodeId(2)),
            vec![(SimTime(0), Message::connect(NodeId(2), NodeId(1)), SimTime(5))]
        );
        assert_eq!(
            sends_from(runner.event_log(), NodeId(1)),
            vec![
                (
                    SimTime(5),
                    Message::change_neighbour(NodeId(1), NodeId(49), NodeId(2), NodeId(2)),
                    SimTime(10)
                ),
                (
                    SimTime(5),
                    Message::new_neighbour(NodeId(1), NodeId(2), NodeId(2), NodeId(1)),
                    SimTime(15)
                ),
            ]
        );
    }

    #[traced_test]
    #[test]
    fn test_independent_sends_share_start_time() {
        let network = NetworkConfig::default()
            .with_fixed_delay(5)
            .with_sequential_sends(false);
        let mut runner = SimulationRunner::new(network, 1).unwrap();
        bootstrap_ring(&mut runner);
        runner
            .add_node(RingNode::joiner(NodeId(2), NodeId(1)))
            .unwrap();

        runner.run_until(SimTime(5));

        let deliver_at: Vec<_> = sends_from(runner.event_log(), NodeId(1))
            .into_iter()
            .map(|(_, _, at)| at)
            .collect();
        assert_eq!(deliver_at, vec![SimTime(10), SimTime(10)]);
    }

    #[traced_test]
    #[test]
    fn test_single_join_settles() {
        let mut runner = SimulationRunner::new(NetworkConfig::default(), 9).unwrap();
        bootstrap_ring(&mut runner);
        runner
            .add_node(RingNode::joiner(NodeId(2), NodeId(1)))
            .unwrap();

        assert!(runner.run_until_settled(SimTime(1_000)));

        let node = |id| runner.node(NodeId(id)).unwrap();
        assert_eq!(node(1).right(), Some(NodeId(2)));
        assert_eq!(node(2).left(), Some(NodeId(1)));
        assert_eq!(node(2).right(), Some(NodeId(49)));
        assert_eq!(node(49).left(), Some(NodeId(2)));
        assert_eq!(runner.stats().messages_in_flight(), 0);
        assert_eq!(runner.stats().protocol_violations, 0);
        assert_eq!(runner.stats().sent_of(MessageKind::Connect), 1);

        assert!(logs_contain("Executing action"));
        assert!(logs_contain("JoinLockAcquired"));
        assert!(logs_contain("StateChanged"));
    }

    #[traced_test]
    #[test]
    fn test_node_without_contact_rejected() {
        let mut runner = SimulationRunner::new(NetworkConfig::default(), 1).unwrap();
        bootstrap_ring(&mut runner);

        let err = runner.add_node(RingNode::new(NodeId(7))).unwrap_err();
        assert_eq!(err, ConfigError::MissingContact(NodeId(7)));
        assert_eq!(runner.node_count(), 3);
        assert_eq!(runner.pending_events(), 3);

        runner.run_until(SimTime(20));
        assert_eq!(runner.stats().protocol_violations, 0);
        assert!(runner.event_log().is_empty());
    }
}
