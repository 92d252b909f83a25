//! Simulated message delivery.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use ringsim_types::ConfigError;

/// Delivery timing for the simulated network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Smallest per-message delay, in ticks.
    pub min_delay: u64,

    /// Largest per-message delay, in ticks (inclusive).
    pub max_delay: u64,

    /// Whether a node's sends within one activation go out one after another.
    ///
    /// When set, each send suspends the sender for its delay: the k-th send
    /// of an activation lands at `now + d1 + .. + dk`, and the node is not
    /// activated again until its last send has landed. Otherwise every send
    /// lands independently at `now + d`.
    pub sequential_sends: bool,

    /// Ticks between the end of one activation and the next.
    pub activation_interval: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            min_delay: 1,
            max_delay: 10,
            sequential_sends: true,
            activation_interval: 1,
        }
    }
}

impl NetworkConfig {
    /// Set the delay bounds.
    pub fn with_delay_range(mut self, min: u64, max: u64) -> Self {
        self.min_delay = min;
        self.max_delay = max;
        self
    }

    /// Set a fixed delay for every message.
    pub fn with_fixed_delay(self, delay: u64) -> Self {
        self.with_delay_range(delay, delay)
    }

    /// Choose between sequential and independent sends.
    pub fn with_sequential_sends(mut self, sequential: bool) -> Self {
        self.sequential_sends = sequential;
        self
    }

    /// Set the activation interval.
    pub fn with_activation_interval(mut self, ticks: u64) -> Self {
        self.activation_interval = ticks;
        self
    }

    /// Check that the configuration can be simulated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_delay > self.max_delay {
            return Err(ConfigError::InvalidDelayRange {
                min: self.min_delay,
                max: self.max_delay,
            });
        }
        if self.activation_interval == 0 {
            return Err(ConfigError::InvalidActivationInterval);
        }
        Ok(())
    }
}

/// Draws message delays.
#[derive(Debug, Clone)]
pub struct SimulatedNetwork {
    config: NetworkConfig,
}

impl SimulatedNetwork {
    /// Create a network, rejecting invalid configurations.
    pub fn new(config: NetworkConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Sample the delay for one message.
    pub fn sample_delay(&self, rng: &mut ChaCha8Rng) -> u64 {
        rng.gen_range(self.config.min_delay..=self.config.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_delays_stay_in_range() {
        let network = SimulatedNetwork::new(NetworkConfig::default()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let delays: Vec<u64> = (0..1000).map(|_| network.sample_delay(&mut rng)).collect();
        assert!(delays.iter().all(|d| (1..=10).contains(d)));
        assert!(delays.contains(&1));
        assert!(delays.contains(&10));
    }

    #[test]
    fn test_same_seed_same_delays() {
        let network = SimulatedNetwork::new(NetworkConfig::default()).unwrap();
        let mut a = ChaCha8Rng::seed_from_u64(7);
        let mut b = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..100 {
            assert_eq!(network.sample_delay(&mut a), network.sample_delay(&mut b));
        }
    }

    #[test]
    fn test_fixed_and_zero_delay() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let network = SimulatedNetwork::new(NetworkConfig::default().with_fixed_delay(0)).unwrap();
        assert_eq!(network.sample_delay(&mut rng), 0);

        let network = SimulatedNetwork::new(NetworkConfig::default().with_fixed_delay(4)).unwrap();
        assert_eq!(network.sample_delay(&mut rng), 4);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = SimulatedNetwork::new(NetworkConfig::default().with_delay_range(5, 2)).unwrap_err();
        assert_eq!(err, ConfigError::InvalidDelayRange { min: 5, max: 2 });

        let err = NetworkConfig::default()
            .with_activation_interval(0)
            .validate()
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidActivationInterval);
    }
}
