//! Ring coordinator.
//!
//! Owns the simulation runner for one scenario: it creates the nodes,
//! registers their recurring activity and offers read-only views of the ring.
//! It never writes node state itself.

use crate::config::SimulatorConfig;
use crate::report::{NodeSummary, RingReport, RingTraversal};
use crate::scenario::ScenarioBuilder;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use ringsim_node::RingNode;
use ringsim_simulation::{EventLog, NetworkConfig, SimulationRunner, SimulationStats};
use ringsim_types::{ConfigError, NodeId, SimTime};
use std::collections::BTreeSet;
use tracing::info;

/// Mixed into the scenario seed to give contact selection its own stream.
const CONTACT_SEED_MASK: u64 = 0x517c_c1b7_2722_0a95;

/// Seed of the contact stream. Never equal to `seed`, so contacts and
/// message delays are drawn from different ChaCha8 streams.
fn contact_seed(seed: u64) -> u64 {
    seed ^ CONTACT_SEED_MASK
}

/// Drives one scenario and exposes its topology.
pub struct RingCoordinator {
    runner: SimulationRunner,
    bootstrap: Vec<NodeId>,
    /// End of a configured run.
    duration: SimTime,
}

impl RingCoordinator {
    /// Build a generated scenario: ring `{1, n-1, n}` with `2..=n-2` joining.
    pub fn build(config: &SimulatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let scenario = ScenarioBuilder::new(config.bootstrap_ids().into_iter().map(|id| id.0))
            .random_joiners(config.joiner_ids().into_iter().map(|id| id.0));

        Ok(Self::from_scenario(scenario, config.network.clone(), config.seed)?
            .with_duration(config.duration))
    }

    /// Build an explicit scenario, configured to run for the default duration.
    pub fn from_scenario(
        scenario: ScenarioBuilder,
        network: NetworkConfig,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        let mut contact_rng = ChaCha8Rng::seed_from_u64(contact_seed(seed));
        let mut bootstrap = scenario.bootstrap_ids().to_vec();
        bootstrap.sort();

        let nodes = scenario.build(&mut contact_rng)?;
        let mut runner = SimulationRunner::new(network, seed)?;
        for node in nodes {
            runner.add_node(node)?;
        }

        info!(
            nodes = runner.node_count(),
            bootstrap = ?bootstrap,
            seed,
            "Built ring scenario"
        );

        Ok(Self {
            runner,
            bootstrap,
            duration: SimulatorConfig::DEFAULT_DURATION,
        })
    }

    /// Set the end of a configured run.
    pub fn with_duration(mut self, duration: SimTime) -> Self {
        self.duration = duration;
        self
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Driving
    // ═══════════════════════════════════════════════════════════════════════════

    /// Run until `until` or queue exhaustion.
    pub fn run(&mut self, until: SimTime) {
        self.runner.run_until(until);
    }

    /// Run until every join has completed or `limit` is passed.
    pub fn run_until_settled(&mut self, limit: SimTime) -> bool {
        self.runner.run_until_settled(limit)
    }

    /// Run for the configured duration.
    pub fn run_configured(&mut self) {
        self.run(self.duration);
    }

    /// Run until settled, with the configured duration as the limit.
    pub fn settle_configured(&mut self) -> bool {
        self.run_until_settled(self.duration)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Inspection
    // ═══════════════════════════════════════════════════════════════════════════

    /// The underlying runner.
    pub fn runner(&self) -> &SimulationRunner {
        &self.runner
    }

    pub fn node(&self, id: NodeId) -> Option<&RingNode> {
        self.runner.node(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &RingNode> {
        self.runner.nodes()
    }

    /// End of a configured run.
    pub fn duration(&self) -> SimTime {
        self.duration
    }

    /// Ids of the initial ring, ascending.
    pub fn bootstrap_ids(&self) -> &[NodeId] {
        &self.bootstrap
    }

    pub fn now(&self) -> SimTime {
        self.runner.now()
    }

    pub fn stats(&self) -> &SimulationStats {
        self.runner.stats()
    }

    pub fn event_log(&self) -> &EventLog {
        self.runner.event_log()
    }

    pub fn is_settled(&self) -> bool {
        self.runner.is_settled()
    }

    /// Follow right links from `start` until it comes around again or a link
    /// is missing.
    ///
    /// Returns an empty, open walk if `start` is unknown or not connected.
    pub fn traverse_from(&self, start: NodeId) -> RingTraversal {
        let mut traversal = RingTraversal {
            nodes: Vec::new(),
            closed: false,
        };
        if !self
            .node(start)
            .is_some_and(|node| node.state().is_connected())
        {
            return traversal;
        }

        let mut seen = BTreeSet::new();
        let mut current = start;
        loop {
            traversal.nodes.push(current);
            seen.insert(current);

            let Some(next) = self.node(current).and_then(RingNode::right) else {
                return traversal;
            };
            if next == start {
                traversal.closed = true;
                return traversal;
            }
            if !seen.insert(next) {
                // Looped back into the walk without passing the start.
                return traversal;
            }
            current = next;
        }
    }

    /// Ring order from the smallest connected node.
    ///
    /// Only meaningful once the ring is closed.
    pub fn dump_ring(&self) -> Vec<NodeId> {
        self.smallest_connected()
            .map(|start| self.traverse_from(start).nodes)
            .unwrap_or_default()
    }

    /// Snapshot of the whole topology.
    pub fn report(&self) -> RingReport {
        RingReport {
            time: self.now(),
            ring: self
                .smallest_connected()
                .map(|start| self.traverse_from(start))
                .unwrap_or(RingTraversal {
                    nodes: Vec::new(),
                    closed: false,
                }),
            nodes: self.nodes().map(NodeSummary::from).collect(),
            settled: self.is_settled(),
        }
    }

    fn smallest_connected(&self) -> Option<NodeId> {
        self.nodes()
            .find(|node| node.state().is_connected())
            .map(RingNode::id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Contact;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_build_generated_scenario() {
        let coordinator = RingCoordinator::build(&SimulatorConfig::new(8)).unwrap();

        assert_eq!(coordinator.runner().node_count(), 8);
        assert_eq!(
            coordinator.bootstrap_ids(),
            &[NodeId(1), NodeId(7), NodeId(8)]
        );
        for id in 2..=6 {
            let contact = coordinator.node(NodeId(id)).unwrap().contact().unwrap();
            assert!(coordinator.bootstrap_ids().contains(&contact));
        }
    }

    #[test]
    fn test_contact_stream_differs_from_delay_stream() {
        for seed in [0, 1, 12345, u64::MAX] {
            assert_ne!(contact_seed(seed), seed);
        }
        assert_ne!(contact_seed(0), 0);
    }

    #[traced_test]
    #[test]
    fn test_configured_duration_bounds_the_run() {
        let config = SimulatorConfig::new(8).with_duration(SimTime(40));
        let mut coordinator = RingCoordinator::build(&config).unwrap();
        assert_eq!(coordinator.duration(), SimTime(40));

        coordinator.run_configured();
        assert_eq!(coordinator.now(), SimTime(40));

        let mut coordinator = RingCoordinator::from_scenario(
            ScenarioBuilder::new([1, 49, 50]).joiner(2, Contact::Fixed(NodeId(1))),
            NetworkConfig::default(),
            1,
        )
        .unwrap()
        .with_duration(SimTime(5_000));
        assert!(coordinator.settle_configured());
        assert!(coordinator.now() <= SimTime(5_000));
    }

    #[traced_test]
    #[test]
    fn test_build_rejects_tiny_ring() {
        let result = RingCoordinator::build(&SimulatorConfig::new(2));
        assert!(matches!(result, Err(ConfigError::NodeCountTooSmall(2))));
    }

    #[traced_test]
    #[test]
    fn test_traversal_before_any_join() {
        let coordinator = RingCoordinator::from_scenario(
            ScenarioBuilder::new([1, 49, 50]).joiner(2, Contact::Fixed(NodeId(1))),
            NetworkConfig::default(),
            1,
        )
        .unwrap();

        let walk = coordinator.traverse_from(NodeId(49));
        assert_eq!(walk.nodes, vec![NodeId(49), NodeId(50), NodeId(1)]);
        assert!(walk.closed);
        assert_eq!(
            coordinator.dump_ring(),
            vec![NodeId(1), NodeId(49), NodeId(50)]
        );

        // Joiner is not connected yet.
        assert!(coordinator.traverse_from(NodeId(2)).nodes.is_empty());
        assert!(coordinator.traverse_from(NodeId(99)).nodes.is_empty());
    }

    #[traced_test]
    #[test]
    fn test_traversal_stops_at_missing_link() {
        let mut coordinator = RingCoordinator::from_scenario(
            ScenarioBuilder::new([1, 49, 50]).joiner(2, Contact::Fixed(NodeId(1))),
            NetworkConfig::default().with_fixed_delay(5),
            1,
        )
        .unwrap();

        // Node 1 has spliced 2 in on its right; 2 has no links yet.
        coordinator.run(SimTime(6));
        assert_eq!(coordinator.node(NodeId(1)).unwrap().right(), Some(NodeId(2)));

        let walk = coordinator.traverse_from(NodeId(1));
        assert_eq!(walk.nodes, vec![NodeId(1), NodeId(2)]);
        assert!(!walk.closed);

        let report = coordinator.report();
        assert!(!report.settled);
        assert_eq!(report.connected_count(), 3);
    }
}
