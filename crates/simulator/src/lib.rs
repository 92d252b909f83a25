//! Ring Simulator
//!
//! Builds ring join scenarios on top of the simulation framework, drives
//! them and inspects the resulting topology.
//!
//! # Architecture
//!
//! The simulator builds on `ringsim-simulation` to provide:
//!
//! - **Scenarios**: a bootstrap ring plus joiners bound to bootstrap contacts
//! - **Coordination**: one recurring activity per node, ring traversal
//! - **Invariants**: checks over the final topology and the event log
//! - **Metrics**: join latency percentiles and message counts
//!
//! # Example
//!
//! ```ignore
//! use ringsim_simulator::{RingCoordinator, SimulatorConfig};
//! use ringsim_types::SimTime;
//!
//! // Bootstrap ring {1, 14, 15} and joiners 2..=13.
//! let config = SimulatorConfig::new(15).with_seed(7);
//!
//! let mut coordinator = RingCoordinator::build(&config)?;
//! coordinator.run(SimTime(2_000));
//!
//! println!("{}", coordinator.report());
//! ```

pub mod config;
pub mod coordinator;
pub mod invariants;
pub mod metrics;
pub mod report;
pub mod scenario;

pub use config::SimulatorConfig;
pub use coordinator::RingCoordinator;
pub use invariants::{InvariantChecker, InvariantViolation, LockInterval};
pub use metrics::{JoinMetrics, MetricsError};
pub use report::{NodeSummary, RingReport, RingTraversal};
pub use scenario::{Contact, ScenarioBuilder};
