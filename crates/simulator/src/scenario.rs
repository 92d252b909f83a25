//! Explicit scenario construction.

use rand::seq::SliceRandom;
use rand::Rng;
use ringsim_node::RingNode;
use ringsim_types::{ConfigError, NodeId};
use std::collections::BTreeSet;
use tracing::debug;

/// How a joiner picks its bootstrap contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    /// A specific bootstrap node.
    Fixed(NodeId),
    /// Drawn uniformly from the bootstrap ring at build time.
    Random,
}

/// A bootstrap ring plus the nodes that will join it.
///
/// ```ignore
/// let nodes = ScenarioBuilder::new([1, 49, 50])
///     .joiner(2, Contact::Fixed(NodeId(1)))
///     .joiner(3, Contact::Random)
///     .build(&mut rng)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScenarioBuilder {
    bootstrap: Vec<NodeId>,
    joiners: Vec<(NodeId, Contact)>,
}

impl ScenarioBuilder {
    /// Start from a bootstrap ring. Ids need not be sorted.
    pub fn new(bootstrap: impl IntoIterator<Item = u64>) -> Self {
        Self {
            bootstrap: bootstrap.into_iter().map(NodeId).collect(),
            joiners: Vec::new(),
        }
    }

    /// Ring {1, 49, 50} with nodes 2 and 3 joining through random contacts.
    pub fn simple() -> Self {
        Self::new([1, 49, 50])
            .joiner(2, Contact::Random)
            .joiner(3, Contact::Random)
    }

    /// Add a joiner.
    pub fn joiner(mut self, id: u64, contact: Contact) -> Self {
        self.joiners.push((NodeId(id), contact));
        self
    }

    /// Add several joiners with random contacts.
    pub fn random_joiners(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.joiners
            .extend(ids.into_iter().map(|id| (NodeId(id), Contact::Random)));
        self
    }

    /// Bootstrap ids as given.
    pub fn bootstrap_ids(&self) -> &[NodeId] {
        &self.bootstrap
    }

    /// Validate and create every node.
    ///
    /// Bootstrap nodes come first, linked in ascending order with the largest
    /// wrapping back to the smallest. Random contacts are drawn from `rng` in
    /// joiner order.
    pub fn build<R: Rng>(self, rng: &mut R) -> Result<Vec<RingNode>, ConfigError> {
        if self.bootstrap.len() < 3 {
            return Err(ConfigError::TooFewBootstrapNodes {
                count: self.bootstrap.len(),
            });
        }

        let mut seen = BTreeSet::new();
        for id in self
            .bootstrap
            .iter()
            .chain(self.joiners.iter().map(|(id, _)| id))
        {
            if !seen.insert(*id) {
                return Err(ConfigError::DuplicateNodeId(*id));
            }
        }

        let mut ring = self.bootstrap.clone();
        ring.sort();
        let (min, max) = (ring[0], ring[ring.len() - 1]);

        let mut nodes: Vec<RingNode> = ring
            .iter()
            .enumerate()
            .map(|(i, &id)| {
                let left = ring[(i + ring.len() - 1) % ring.len()];
                let right = ring[(i + 1) % ring.len()];
                RingNode::bootstrap(id, left, right)
            })
            .collect();

        for (id, contact) in self.joiners {
            if id <= min || id >= max {
                return Err(ConfigError::JoinerOutOfRange { node: id, min, max });
            }
            let contact = match contact {
                Contact::Fixed(contact) if ring.contains(&contact) => contact,
                Contact::Fixed(contact) => {
                    return Err(ConfigError::UnknownContact { node: id, contact })
                }
                Contact::Random => *ring.choose(&mut *rng).ok_or(ConfigError::TooFewBootstrapNodes {
                    count: ring.len(),
                })?,
            };
            debug!(node = %id, contact = %contact, "Assigned bootstrap contact");
            nodes.push(RingNode::joiner(id, contact));
        }

        Ok(nodes)
    }
}
