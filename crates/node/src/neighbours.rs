//! A node's two neighbour slots.

use ringsim_types::{NodeId, Side};

/// Left and right neighbour of a ring node, by id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Neighbours {
    left: Option<NodeId>,
    right: Option<NodeId>,
}

impl Neighbours {
    /// Create with both slots set.
    pub fn new(left: NodeId, right: NodeId) -> Self {
        Self {
            left: Some(left),
            right: Some(right),
        }
    }

    /// Predecessor.
    pub fn left(&self) -> Option<NodeId> {
        self.left
    }

    /// Successor.
    pub fn right(&self) -> Option<NodeId> {
        self.right
    }

    /// Neighbour in the given slot.
    pub fn get(&self, side: Side) -> Option<NodeId> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// Overwrite a slot, returning the previous occupant.
    pub(crate) fn replace(&mut self, side: Side, id: NodeId) -> Option<NodeId> {
        let slot = match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        };
        slot.replace(id)
    }

    /// Both slots set.
    pub fn is_complete(&self) -> bool {
        self.left.is_some() && self.right.is_some()
    }

    /// Whether `id` occupies either slot.
    pub fn contains(&self, id: NodeId) -> bool {
        self.left == Some(id) || self.right == Some(id)
    }

    /// Whether `own` should point `side` at `candidate`.
    ///
    /// True for an empty slot, for the current occupant, and for any id that
    /// sits strictly between `own` and the current occupant.
    pub fn accepts(&self, own: NodeId, side: Side, candidate: NodeId) -> bool {
        match self.get(side) {
            None => true,
            Some(current) => current == candidate || side.is_nearer(own, candidate, current),
        }
    }
}
