//! Read-only views of the ring for reporting.

use ringsim_node::RingNode;
use ringsim_types::{NodeId, NodeState, SimTime};
use std::fmt;

/// Result of following right links from a start node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingTraversal {
    /// Visited nodes, starting with the start node.
    pub nodes: Vec<NodeId>,

    /// Whether the walk came back to the start.
    ///
    /// False if it hit a missing link or looped without returning.
    pub closed: bool,
}

impl RingTraversal {
    /// A closed walk whose ids ascend until the single wrap back to the start.
    pub fn is_ascending_cycle(&self) -> bool {
        if !self.closed || self.nodes.is_empty() {
            return false;
        }
        let descents = self
            .nodes
            .iter()
            .zip(self.nodes.iter().cycle().skip(1))
            .filter(|(a, b)| b <= a)
            .count();
        descents == 1
    }
}

impl fmt::Display for RingTraversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.nodes.iter().map(|id| id.0.to_string()).collect();
        write!(f, "{}", ids.join(" -> "))?;
        match (self.closed, self.nodes.first()) {
            (true, Some(start)) => write!(f, " -> {}", start.0),
            _ => write!(f, " -> ?"),
        }
    }
}

/// One node's links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSummary {
    pub id: NodeId,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
    pub state: NodeState,
}

impl From<&RingNode> for NodeSummary {
    fn from(node: &RingNode) -> Self {
        Self {
            id: node.id(),
            left: node.left(),
            right: node.right(),
            state: node.state(),
        }
    }
}

impl fmt::Display for NodeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |id: Option<NodeId>| id.map_or_else(|| "-".to_string(), |id| id.0.to_string());
        write!(
            f,
            "{:>4} <- {:<4} -> {:<4} {}",
            show(self.left),
            self.id.0,
            show(self.right),
            self.state
        )
    }
}

/// Final state of the ring.
#[derive(Debug, Clone)]
pub struct RingReport {
    /// Simulation time of the snapshot.
    pub time: SimTime,

    /// Walk from the smallest connected node.
    pub ring: RingTraversal,

    /// Every node, in id order.
    pub nodes: Vec<NodeSummary>,

    /// Whether all joins had completed.
    pub settled: bool,
}

impl RingReport {
    /// Number of connected nodes.
    pub fn connected_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| node.state.is_connected())
            .count()
    }
}

impl fmt::Display for RingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Ring at {} ({}/{} connected{})",
            self.time,
            self.connected_count(),
            self.nodes.len(),
            if self.settled { ", settled" } else { "" }
        )?;
        writeln!(f, "  {}", self.ring)?;
        for node in &self.nodes {
            writeln!(f, "  {}", node)?;
        }
        Ok(())
    }
}
