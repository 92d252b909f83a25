//! Configuration types for the simulator.

use ringsim_simulation::NetworkConfig;
use ringsim_types::{ConfigError, NodeId, SimTime};

/// Configuration for a generated scenario.
///
/// Node ids are `1..=node_count`. The bootstrap ring is the smallest id and
/// the two largest; every id in between joins.
#[derive(Clone, Debug)]
pub struct SimulatorConfig {
    /// Total number of nodes, bootstrap ring included.
    pub node_count: u64,

    /// Message delivery settings.
    pub network: NetworkConfig,

    /// Simulated time to run for, or the limit when running until settled.
    pub duration: SimTime,

    /// Random seed for deterministic simulation.
    pub seed: u64,
}

impl SimulatorConfig {
    /// Run length when none is given.
    pub const DEFAULT_DURATION: SimTime = SimTime(200);

    /// Create a new simulator configuration.
    pub fn new(node_count: u64) -> Self {
        Self {
            node_count,
            network: NetworkConfig::default(),
            duration: Self::DEFAULT_DURATION,
            seed: 12345,
        }
    }

    /// Set the network configuration.
    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    /// Set how long to run.
    pub fn with_duration(mut self, duration: SimTime) -> Self {
        self.duration = duration;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Ids of the initial ring, ascending.
    pub fn bootstrap_ids(&self) -> Vec<NodeId> {
        vec![
            NodeId(1),
            NodeId(self.node_count.saturating_sub(1)),
            NodeId(self.node_count),
        ]
    }

    /// Ids of the nodes that join.
    pub fn joiner_ids(&self) -> Vec<NodeId> {
        (2..self.node_count.saturating_sub(1)).map(NodeId).collect()
    }

    /// Check that the configuration can be built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_count < 3 {
            return Err(ConfigError::NodeCountTooSmall(self.node_count));
        }
        self.network.validate()
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self::new(15)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_layout() {
        let config = SimulatorConfig::new(6);
        assert_eq!(config.bootstrap_ids(), vec![NodeId(1), NodeId(5), NodeId(6)]);
        assert_eq!(
            config.joiner_ids(),
            vec![NodeId(2), NodeId(3), NodeId(4)]
        );

        let config = SimulatorConfig::new(3);
        assert_eq!(config.bootstrap_ids(), vec![NodeId(1), NodeId(2), NodeId(3)]);
        assert!(config.joiner_ids().is_empty());
    }

    #[test]
    fn test_validate() {
        assert!(SimulatorConfig::new(3).validate().is_ok());
        assert_eq!(
            SimulatorConfig::new(2).validate(),
            Err(ConfigError::NodeCountTooSmall(2))
        );
        assert_eq!(
            SimulatorConfig::new(10)
                .with_network(NetworkConfig::default().with_delay_range(4, 1))
                .validate(),
            Err(ConfigError::InvalidDelayRange { min: 4, max: 1 })
        );
    }
}
