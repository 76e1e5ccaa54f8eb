use anyhow::{bail, Result};
use clap::{ArgAction, Parser, Subcommand};
use log::{info, warn};
use std::path::PathBuf;
use tokio::runtime::Builder;

use custom_dv::algorithms::all_pairs_costs;
use custom_dv::config::SimulationConfig;
use custom_dv::network::{ActorNetwork, Simulator, Topology};
use custom_dv::Cost;

#[derive(Parser)]
#[command(name = "custom-dv", about = "Distance-vector routing simulation")]
struct Cli {
    /// Repeat for more detail (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a network until it converges or a bound is hit
    Run {
        /// JSON configuration; the four-node network when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        max_time: Option<f64>,

        #[arg(long)]
        max_events: Option<usize>,

        /// Add the classic 0-1 link changes to the default network
        #[arg(long)]
        link_changes: bool,

        /// Check the final costs against an independent shortest-path run
        #[arg(long)]
        verify: bool,

        /// Run every node as a tokio task instead of the event simulator
        #[arg(long)]
        actors: bool,
    },
    /// Print or write the default configuration
    DefaultConfig {
        #[arg(long)]
        out: Option<PathBuf>,

        #[arg(long)]
        link_changes: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run {
            config,
            seed,
            max_time,
            max_events,
            link_changes,
            verify,
            actors,
        } => {
            let mut config = match config {
                Some(path) => SimulationConfig::load(&path)?,
                None if link_changes => SimulationConfig::with_link_changes(),
                None => SimulationConfig::default(),
            };
            if let Some(seed) = seed {
                config.seed = seed;
            }
            if max_time.is_some() {
                config.max_time = max_time;
            }
            if max_events.is_some() {
                config.max_events = max_events;
            }

            let final_costs = if actors {
                run_actors(&config)?
            } else {
                run_simulation(&config)?
            };

            if verify {
                verify_costs(&config, &final_costs, !actors)?;
            }
        }
        Command::DefaultConfig { out, link_changes } => {
            let config = if link_changes {
                SimulationConfig::with_link_changes()
            } else {
                SimulationConfig::default()
            };
            match out {
                Some(path) => {
                    config.save(&path)?;
                    println!("Configuration written to {}", path.display());
                }
                None => println!("{}", serde_json::to_string_pretty(&config)?),
            }
        }
    }

    Ok(())
}

fn run_simulation(config: &SimulationConfig) -> Result<Vec<Vec<Cost>>> {
    let mut simulator = Simulator::from_config(config)?;
    let report = simulator.run();

    println!("=== Simulation finished at t={:.3} ===", report.final_time);
    println!(
        "Events: {}  packets sent: {}  delivered: {}  broadcasts: {}  link changes: {}  rejected: {}",
        report.events_processed,
        report.packets_sent,
        report.packets_delivered,
        report.broadcasts,
        report.link_changes_applied,
        report.rejected_events
    );
    if !report.drained {
        warn!("Run stopped by a bound with {} events still queued", simulator.pending_events());
    }

    for node in simulator.nodes() {
        println!("\n{}", node);
    }

    Ok(simulator.min_costs())
}

fn run_actors(config: &SimulationConfig) -> Result<Vec<Vec<Cost>>> {
    let topology = config.topology()?;
    let rt = Builder::new_multi_thread().enable_all().build()?;

    rt.block_on(async {
        let network = ActorNetwork::spawn(&topology);
        network.wait_idle().await;
        info!("Initial convergence reached");

        // link changes are replayed in time order, each after the previous settled
        for change in config.sorted_link_changes() {
            info!("Applying link change {} <-> {} = {}", change.a, change.b, change.cost);
            network.change_link(change.a, change.b, change.cost)?;
            network.wait_idle().await;
        }

        let snapshots = network.snapshots().await?;
        network.shutdown().await;

        println!("=== Actor network settled ===");
        for snapshot in &snapshots {
            println!("\n{}", snapshot.table);
            println!(
                "Node {}'s minimum costs to other nodes: {:?}",
                snapshot.id,
                snapshot.min_cost.as_slice()
            );
        }

        let costs: Vec<Vec<Cost>> = snapshots.into_iter().map(|s| s.min_cost.into()).collect();
        Ok::<_, anyhow::Error>(costs)
    })
}

fn verify_costs(
    config: &SimulationConfig,
    final_costs: &[Vec<Cost>],
    time_bounded: bool,
) -> Result<()> {
    let mut topology: Topology = config.topology()?;
    for change in config.sorted_link_changes() {
        if time_bounded && config.max_time.is_some_and(|max| change.time > max) {
            continue;
        }
        let cost = custom_dv::cost_from_raw(change.cost)?;
        topology.set_cost(change.a, change.b, cost);
        topology.set_cost(change.b, change.a, cost);
    }

    let expected = all_pairs_costs(&topology);
    let mut mismatches = 0;
    for (node, (got, want)) in final_costs.iter().zip(&expected).enumerate() {
        if got != want {
            mismatches += 1;
            println!("Node {}: converged to {:?}, shortest paths are {:?}", node, got, want);
        }
    }

    if mismatches > 0 {
        bail!("{} node(s) did not reach shortest-path costs", mismatches);
    }
    println!("\nVerified: every node holds the shortest-path costs");
    Ok(())
}
