//! fgaload binary
//!
//! # Usage
//!
//! ```bash
//! # Smoke test against a local server
//! FGALOAD_API__STORE_ID=01HSTORE fgaload run
//!
//! # Stress scenario from a config file, keep the tuples afterwards
//! fgaload --config fgaload.yaml run --scenario stress --no-teardown
//!
//! # Inspect the generated workload without sending anything
//! fgaload plan --dump
//! ```

use clap::{Parser, Subcommand};
use fgaload::config::LoadTestConfig;
use fgaload::observability::{init_logging, init_metrics, serve_metrics, LoggingConfig};
use fgaload_graph::{TupleKey, WorkloadStats};
use serde::Serialize;
use tracing::{info, warn};

/// fgaload - load tester for OpenFGA-compatible authorization services
#[derive(Parser, Debug)]
#[command(name = "fgaload")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the graph, probe it, then delete it
    Run(RunArgs),
    /// Generate the workload and print it as JSON without touching the network
    Plan(PlanArgs),
}

#[derive(clap::Args, Debug, Default)]
struct RunArgs {
    /// Scenario profile: smoke, load, stress or soak
    #[arg(short, long)]
    scenario: Option<String>,

    /// Number of virtual users (overrides the scenario)
    #[arg(long)]
    vus: Option<usize>,

    /// Probe phase duration in seconds (overrides the scenario)
    #[arg(short, long)]
    duration: Option<u64>,

    /// Leave the written tuples in the store
    #[arg(long)]
    no_teardown: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args, Debug, Default)]
struct PlanArgs {
    /// Include every tuple and probe, not just the counts
    #[arg(long)]
    dump: bool,
}

#[derive(Serialize)]
struct PlanOutput<'a> {
    seed: u64,
    stats: &'a WorkloadStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    tuples: Option<&'a [TupleKey]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    probes: Option<&'a [TupleKey]>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => LoadTestConfig::load(path)?,
        None => LoadTestConfig::from_env()?,
    };

    init_logging(LoggingConfig::from_settings(&config.logging));
    info!(version = env!("CARGO_PKG_VERSION"), "starting fgaload");

    match args.command {
        Command::Plan(plan_args) => print_plan(&config, &plan_args),
        Command::Run(run_args) => run(config, &run_args).await,
    }
}

fn print_plan(config: &LoadTestConfig, args: &PlanArgs) -> anyhow::Result<()> {
    let plan = fgaload::plan(config);
    let output = PlanOutput {
        seed: plan.seed,
        stats: plan.workload.stats(),
        tuples: args.dump.then(|| plan.workload.tuples()),
        probes: args.dump.then(|| plan.workload.probes()),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run(mut config: LoadTestConfig, args: &RunArgs) -> anyhow::Result<()> {
    apply_overrides(&mut config, args);
    config.validate()?;
    let profile = config.profile()?;

    let metrics_server = if config.metrics.enabled {
        let state = init_metrics()?;
        match config.metrics.listen_addr {
            Some(addr) => Some(serve_metrics(state, addr).await?),
            None => None,
        }
    } else {
        None
    };

    let teardown = config.run.teardown && !args.no_teardown;
    let summary = fgaload::run(&config, profile, teardown).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{summary}");
    }

    if summary.assertion_failures() > 0 {
        warn!(
            failures = summary.assertion_failures(),
            "run finished with assertion failures"
        );
    }

    if let Some(handle) = metrics_server {
        handle.abort();
    }
    Ok(())
}

fn apply_overrides(config: &mut LoadTestConfig, args: &RunArgs) {
    if let Some(scenario) = &args.scenario {
        config.run.scenario = scenario.clone();
    }
    if args.vus.is_some() {
        config.run.vus = args.vus;
    }
    if args.duration.is_some() {
        config.run.duration_secs = args.duration;
    }
    if args.no_teardown {
        config.run.teardown = false;
    }
}
