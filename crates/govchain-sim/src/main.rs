use anyhow::{Context, Result};
use clap::Parser;
use govchain_core::GovernanceConfig;
use govchain_sim::{Simulation, SimulationConfig};
use prometheus::Registry;
use prometheus_bridge::{render, GovernanceMetrics};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Run the governance chain simulation.
#[derive(Parser, Debug)]
#[command(name = "govchain-sim", version, about)]
struct Args {
    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 48)]
    ticks: usize,

    /// Seed for reproducible runs; overrides the simulation config.
    #[arg(long)]
    seed: Option<u64>,

    /// Engine config (JSON).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Simulation config (JSON).
    #[arg(long)]
    sim_config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Write the final chain state as JSON to this path.
    #[arg(long)]
    dump_ledger: Option<PathBuf>,

    /// Print Prometheus gauges after the run.
    #[arg(long)]
    metrics: bool,
}

fn init_tracing(args: &Args) {
    let default = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if args.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    let governance = match &args.config {
        Some(path) => GovernanceConfig::load(path).context("loading engine config")?,
        None => GovernanceConfig::default(),
    };
    let mut sim_config = match &args.sim_config {
        Some(path) => SimulationConfig::load(path).context("loading simulation config")?,
        None => SimulationConfig::default(),
    };
    if args.seed.is_some() {
        sim_config.seed = args.seed;
    }

    let mut sim = Simulation::new(governance, sim_config);
    let summary = sim.run(args.ticks)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    let chain = sim.chain();
    chain
        .ledger()
        .verify_linkage()
        .context("ledger linkage check failed")?;

    if let Some(path) = &args.dump_ledger {
        std::fs::write(path, chain.export_json()?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), blocks = chain.ledger().len(), "chain state written");
    }

    if args.metrics {
        let registry = Registry::new();
        let gauges = GovernanceMetrics::register(&registry)?;
        gauges.observe(chain);
        print!("{}", render(&registry)?);
    }

    Ok(())
}
