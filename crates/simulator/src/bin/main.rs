//! Ring Simulator CLI
//!
//! Runs a ring join scenario and prints the resulting topology.

use clap::{Args, Parser, Subcommand};
use ringsim_simulation::NetworkConfig;
use ringsim_simulator::{
    InvariantChecker, JoinMetrics, RingCoordinator, ScenarioBuilder, SimulatorConfig,
};
use ringsim_types::SimTime;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ringsim")]
#[command(about = "Discrete-event simulation of nodes joining a ring DHT")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Ring {1, 49, 50} with nodes 2 and 3 joining concurrently
    Simple,

    /// Ring {1, n-1, n} with nodes 2..=n-2 joining
    Generated {
        /// Total number of nodes
        #[arg(short, long, default_value = "15")]
        nodes: u64,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Random seed
    #[arg(long, global = true, default_value = "12345")]
    seed: u64,

    /// Simulated ticks to run for
    #[arg(long, global = true, default_value = "200")]
    until: u64,

    /// Smallest message delay in ticks
    #[arg(long, global = true, default_value = "1")]
    min_delay: u64,

    /// Largest message delay in ticks
    #[arg(long, global = true, default_value = "10")]
    max_delay: u64,

    /// Let a node's sends travel independently instead of one after another
    #[arg(long, global = true)]
    parallel_sends: bool,

    /// Stop as soon as every join has completed (`--until` becomes the limit)
    #[arg(long, global = true)]
    settle: bool,

    /// Write the event log as JSON to this file
    #[arg(long, global = true)]
    log_json: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = cli.run;
    let network = NetworkConfig::default()
        .with_delay_range(args.min_delay, args.max_delay)
        .with_sequential_sends(!args.parallel_sends);

    let until = SimTime(args.until);
    let mut coordinator = match cli.command {
        Commands::Simple => {
            RingCoordinator::from_scenario(ScenarioBuilder::simple(), network, args.seed)?
                .with_duration(until)
        }
        Commands::Generated { nodes } => {
            let config = SimulatorConfig::new(nodes)
                .with_network(network)
                .with_seed(args.seed)
                .with_duration(until);
            RingCoordinator::build(&config)?
        }
    };

    if args.settle {
        coordinator.settle_configured();
    } else {
        coordinator.run_configured();
    }

    println!("{}", coordinator.report());
    println!("{}", JoinMetrics::from_log(coordinator.event_log())?);

    if let Some(path) = args.log_json {
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(writer, coordinator.event_log())?;
        info!(path = %path.display(), entries = coordinator.event_log().len(), "Wrote event log");
    }

    let violations = if coordinator.is_settled() {
        InvariantChecker::check_settled(&coordinator)
    } else {
        InvariantChecker::check_running(&coordinator)
    };
    for violation in &violations {
        warn!(%violation, "Invariant violated");
    }
    if !violations.is_empty() {
        return Err(format!("{} invariant violation(s)", violations.len()).into());
    }

    Ok(())
}
