//! Join protocol state machine for a single ring node.
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected ──(first activation: Connect to contact)──▶ AwaitingConnection
//! AwaitingConnection ──(both neighbours announced)──▶ Connected
//! ```
//!
//! # Join handling
//!
//! `Connect` and `Redirect` are never served inline. They wait in
//! `pending_joins` and the oldest one is served at the end of an activation,
//! but only while the join lock is free. Serving a request either hands it on
//! toward the requester's position (no lock) or splices the requester in next
//! to this node, which holds the lock until the requester reports
//! `SuccessJoin`.

use crate::Neighbours;
use indexmap::IndexSet;
use ringsim_core::{Action, Event, Notification, StateMachine};
use ringsim_messages::{Message, Payload};
use ringsim_types::{NodeId, NodeState, ProtocolViolation, Side, SimTime};
use std::collections::{BTreeSet, VecDeque};
use tracing::{debug, info, trace, warn};

/// A ring participant.
#[derive(Debug, Clone)]
pub struct RingNode {
    /// This node's id.
    id: NodeId,

    /// Left and right neighbour ids.
    neighbours: Neighbours,

    /// Lifecycle state.
    state: NodeState,

    /// Bootstrap contact, fixed at construction.
    contact: Option<NodeId>,

    /// Messages delivered since the last activation.
    inbox: VecDeque<Message>,

    /// Join requests waiting for the lock.
    pending_joins: VecDeque<Message>,

    /// Join currently being spliced through this node.
    ///
    /// A joiner holds its own id here from the moment it asks to join until
    /// it is connected, so it never serves requests while half-linked.
    join_lock: Option<NodeId>,

    /// Nodes that announced themselves with `NewNeighbour`, in arrival order.
    introducers: IndexSet<NodeId>,

    /// Nodes already sent our `SuccessJoin`.
    acknowledged: BTreeSet<NodeId>,

    /// Current simulation time.
    now: SimTime,
}

impl RingNode {
    /// Create a bare disconnected node with no contact.
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            neighbours: Neighbours::default(),
            state: NodeState::Disconnected,
            contact: None,
            inbox: VecDeque::new(),
            pending_joins: VecDeque::new(),
            join_lock: None,
            introducers: IndexSet::new(),
            acknowledged: BTreeSet::new(),
            now: SimTime::ZERO,
        }
    }

    /// Create a member of the bootstrap ring, already linked on both sides.
    pub fn bootstrap(id: NodeId, left: NodeId, right: NodeId) -> Self {
        Self {
            neighbours: Neighbours::new(left, right),
            state: NodeState::Connected,
            ..Self::new(id)
        }
    }

    /// Create a disconnected node that will join through `contact`.
    pub fn joiner(id: NodeId, contact: NodeId) -> Self {
        Self {
            contact: Some(contact),
            ..Self::new(id)
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════════

    /// This node's id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Predecessor.
    pub fn left(&self) -> Option<NodeId> {
        self.neighbours.left()
    }

    /// Successor.
    pub fn right(&self) -> Option<NodeId> {
        self.neighbours.right()
    }

    /// Both neighbour slots.
    pub fn neighbours(&self) -> &Neighbours {
        &self.neighbours
    }

    /// Lifecycle state.
    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Bootstrap contact, if this node was created as a joiner.
    pub fn contact(&self) -> Option<NodeId> {
        self.contact
    }

    /// The join currently holding this node's lock.
    pub fn join_lock(&self) -> Option<NodeId> {
        self.join_lock
    }

    /// Whether the join lock is held.
    pub fn is_join_locked(&self) -> bool {
        self.join_lock.is_some()
    }

    /// Number of queued join requests.
    pub fn pending_join_count(&self) -> usize {
        self.pending_joins.len()
    }

    /// Number of undelivered inbox messages.
    pub fn inbox_len(&self) -> usize {
        self.inbox.len()
    }

    /// Connected with nothing left to do.
    pub fn is_settled(&self) -> bool {
        self.state.is_connected()
            && self.join_lock.is_none()
            && self.pending_joins.is_empty()
            && self.inbox.is_empty()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Activation
    // ═══════════════════════════════════════════════════════════════════════════

    fn on_activate(&mut self) -> Vec<Action> {
        match self.state {
            NodeState::Disconnected => self.request_join(),
            NodeState::AwaitingConnection | NodeState::Connected => {
                let mut actions = Vec::new();
                while let Some(message) = self.inbox.pop_front() {
                    self.on_message(message, &mut actions);
                }
                if self.join_lock.is_none() {
                    if let Some(request) = self.pending_joins.pop_front() {
                        self.on_connection_request(request.subject(), &mut actions);
                    }
                }
                actions
            }
        }
    }

    /// First activation of a disconnected node.
    fn request_join(&mut self) -> Vec<Action> {
        let Some(contact) = self.contact else {
            return vec![self.violation(ProtocolViolation::NoContact(self.id))];
        };

        debug!(node = %self.id, contact = %contact, "Requesting to join");

        let mut actions = vec![Action::Send {
            message: Message::connect(self.id, contact),
        }];
        self.acquire_lock(self.id, &mut actions);
        self.transition(NodeState::AwaitingConnection, &mut actions);
        actions
    }

    fn on_message(&mut self, message: Message, actions: &mut Vec<Action>) {
        trace!(node = %self.id, message = %message, "Processing message");

        match message.payload {
            Payload::Connect { subject } | Payload::Redirect { subject } => {
                self.pending_joins.push_back(message);
                actions.push(Action::Emit(Notification::JoinQueued { subject }));
            }
            Payload::ChangeNeighbour { subject, announced } => {
                self.on_change_neighbour(message.sender, subject, announced, actions)
            }
            Payload::NewNeighbour { subject, announced } => {
                self.on_new_neighbour(message.sender, subject, announced, actions)
            }
            Payload::SuccessJoin { subject } => self.on_success_join(subject, actions),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Join Requests
    // ═══════════════════════════════════════════════════════════════════════════

    /// Serve the oldest queued join request for `requester`.
    fn on_connection_request(&mut self, requester: NodeId, actions: &mut Vec<Action>) {
        let (left, right) = match (self.left(), self.right()) {
            (Some(left), Some(right)) => (left, right),
            (None, _) => {
                actions.push(self.violation(ProtocolViolation::MissingNeighbour {
                    node: self.id,
                    side: Side::Left,
                }));
                return;
            }
            (_, None) => {
                actions.push(self.violation(ProtocolViolation::MissingNeighbour {
                    node: self.id,
                    side: Side::Right,
                }));
                return;
            }
        };

        if requester == self.id || self.neighbours.contains(requester) {
            actions.push(self.violation(ProtocolViolation::DuplicateJoin {
                node: self.id,
                subject: requester,
            }));
            return;
        }

        // Hand the request on while a neighbour still lies between us and the
        // requester's position.
        let forward_to = if requester > right && right > self.id {
            Some(right)
        } else if requester < left && left < self.id {
            Some(left)
        } else {
            None
        };

        if let Some(next) = forward_to {
            debug!(
                node = %self.id,
                subject = %requester,
                to = %next,
                "Redirecting join request"
            );
            actions.push(Action::Send {
                message: Message::redirect(self.id, next, requester),
            });
            actions.push(Action::Emit(Notification::Redirected {
                subject: requester,
                to: next,
            }));
            return;
        }

        let side = Side::toward(self.id, requester);
        let displaced = if side == Side::Right { right } else { left };

        debug!(
            node = %self.id,
            subject = %requester,
            side = %side,
            displaced = %displaced,
            "Splicing in joiner"
        );

        self.acquire_lock(requester, actions);
        actions.push(Action::Send {
            message: Message::change_neighbour(self.id, displaced, requester, requester),
        });
        self.set_neighbour(side, requester, actions);
        actions.push(Action::Send {
            message: Message::new_neighbour(self.id, requester, requester, self.id),
        });
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Splice Messages
    // ═══════════════════════════════════════════════════════════════════════════

    fn on_change_neighbour(
        &mut self,
        sender: NodeId,
        subject: NodeId,
        announced: NodeId,
        actions: &mut Vec<Action>,
    ) {
        if announced == self.id {
            actions.push(self.violation(ProtocolViolation::SelfAnnouncement(self.id)));
            return;
        }

        let side = Side::toward(self.id, announced);
        let current = self.neighbours.get(side);

        if current == Some(announced) {
            actions.push(Action::Send {
                message: Message::new_neighbour(self.id, announced, subject, self.id),
            });
            return;
        }

        if self.neighbours.accepts(self.id, side, announced) {
            self.set_neighbour(side, announced, actions);
            actions.push(Action::Send {
                message: Message::new_neighbour(self.id, announced, subject, self.id),
            });
            // The node we just dropped may still point at us; send it on.
            if let Some(displaced) = current.filter(|&displaced| displaced != sender) {
                actions.push(Action::Send {
                    message: Message::change_neighbour(self.id, displaced, subject, announced),
                });
            }
            return;
        }

        if let Some(current) = current {
            // A concurrent splice already put `current` between us and
            // `announced`.
            debug!(
                node = %self.id,
                announced = %announced,
                to = %current,
                "Forwarding stale neighbour change"
            );
            actions.push(Action::Send {
                message: Message::change_neighbour(self.id, current, subject, announced),
            });
        }
    }

    fn on_new_neighbour(
        &mut self,
        sender: NodeId,
        subject: NodeId,
        announced: NodeId,
        actions: &mut Vec<Action>,
    ) {
        if announced == self.id {
            actions.push(self.violation(ProtocolViolation::SelfAnnouncement(self.id)));
            return;
        }

        self.introducers.insert(sender);

        let side = Side::toward(self.id, announced);
        let current = self.neighbours.get(side);

        if self.neighbours.accepts(self.id, side, announced) {
            self.set_neighbour(side, announced, actions);
            if let Some(displaced) = current.filter(|&displaced| displaced != announced) {
                actions.push(Action::Send {
                    message: Message::change_neighbour(self.id, displaced, subject, announced),
                });
            }
        } else if let Some(current) = current {
            // `announced` points at us, but `current` sits between us.
            actions.push(Action::Send {
                message: Message::change_neighbour(self.id, announced, subject, current),
            });
        }

        if self.state != NodeState::Connected && self.neighbours.is_complete() {
            self.complete_join(actions);
        } else if self.state == NodeState::Connected && self.acknowledged.insert(sender) {
            actions.push(Action::Send {
                message: Message::success_join(self.id, sender),
            });
        }
    }

    /// Both neighbours are known: become connected and tell everyone who
    /// helped link us.
    fn complete_join(&mut self, actions: &mut Vec<Action>) {
        self.transition(NodeState::Connected, actions);
        if self.join_lock == Some(self.id) {
            self.release_lock(actions);
        }

        let mut targets: IndexSet<NodeId> = IndexSet::new();
        targets.extend(self.left());
        targets.extend(self.right());
        targets.extend(self.introducers.iter().copied());

        info!(
            node = %self.id,
            left = ?self.left(),
            right = ?self.right(),
            time = %self.now,
            "Joined ring"
        );

        for target in targets {
            self.acknowledged.insert(target);
            actions.push(Action::Send {
                message: Message::success_join(self.id, target),
            });
        }
    }

    fn on_success_join(&mut self, subject: NodeId, actions: &mut Vec<Action>) {
        if self.join_lock == Some(subject) {
            self.release_lock(actions);
        } else {
            trace!(
                node = %self.id,
                subject = %subject,
                lock = ?self.join_lock,
                "Ignoring success for a join we are not holding"
            );
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // State Helpers
    // ═══════════════════════════════════════════════════════════════════════════

    fn set_neighbour(&mut self, side: Side, id: NodeId, actions: &mut Vec<Action>) {
        let previous = self.neighbours.replace(side, id);
        if previous != Some(id) {
            actions.push(Action::Emit(Notification::NeighbourChanged {
                side,
                previous,
                current: id,
            }));
        }
    }

    fn acquire_lock(&mut self, subject: NodeId, actions: &mut Vec<Action>) {
        self.join_lock = Some(subject);
        actions.push(Action::Emit(Notification::JoinLockAcquired { subject }));
    }

    fn release_lock(&mut self, actions: &mut Vec<Action>) {
        if let Some(subject) = self.join_lock.take() {
            trace!(node = %self.id, subject = %subject, "Join lock released");
            actions.push(Action::Emit(Notification::JoinLockReleased { subject }));
        }
    }

    fn transition(&mut self, to: NodeState, actions: &mut Vec<Action>) {
        let from = self.state;
        self.state = to;
        actions.push(Action::Emit(Notification::StateChanged { from, to }));
    }

    fn violation(&self, violation: ProtocolViolation) -> Action {
        warn!(node = %self.id, %violation, "Dropping request");
        Action::Emit(Notification::ProtocolViolation(violation))
    }
}

impl StateMachine for RingNode {
    fn handle(&mut self, event: Event) -> Vec<Action> {
        match event {
            Event::Activate => self.on_activate(),
            Event::MessageReceived { message } => {
                self.inbox.push_back(message);
                vec![]
            }
        }
    }

    fn set_time(&mut self, now: SimTime) {
        self.now = now;
    }

    fn now(&self) -> SimTime {
        self.now
    }
}
