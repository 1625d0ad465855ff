mod config_file;
mod logging;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use quipu_core::validate_config;
use quipu_domains::builtin_registry;
use quipu_engine::{
    CsvSink, DemandCalendar, EngineError, HeuristicEstimator, ResourceBudget, RunOrchestrator,
    SeedDerivation, SizeEstimator, SystemMemoryProbe,
};

#[derive(Debug, Error)]
enum CliError {
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("logging init failed: {0}")]
    Logging(String),
}

#[derive(Parser, Debug)]
#[command(name = "quipu", version, about = "Synthetic ERP dataset generator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a dataset into a fresh run directory.
    Generate(GenerateArgs),
    /// Print the projected footprint without generating anything.
    Estimate(EstimateArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Path to the TOML configuration file.
    #[arg(long, value_name = "PATH")]
    config: PathBuf,
    /// Domain to generate.
    #[arg(long, default_value = "sales")]
    domain: String,
    /// Output directory for runs.
    #[arg(long, default_value = "runs")]
    out: PathBuf,
    /// Verbose logging.
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct EstimateArgs {
    /// Path to the TOML configuration file.
    #[arg(long, value_name = "PATH")]
    config: PathBuf,
    /// Domain to estimate.
    #[arg(long, default_value = "sales")]
    domain: String,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Estimate(args) => run_estimate(args),
    }
}

fn run_generate(args: GenerateArgs) -> Result<(), CliError> {
    logging::init(args.verbose).map_err(CliError::Logging)?;

    let loaded = config_file::load(&args.config)?;
    let registry = builtin_registry(loaded.sales, loaded.run.chaos.global_seed);
    let domain = registry.get(&args.domain)?;

    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let run_dir = args
        .out
        .join(format!("{timestamp}__run_{}", Uuid::new_v4()));
    std::fs::create_dir_all(&run_dir)?;
    std::fs::write(
        run_dir.join("resolved_config.json"),
        serde_json::to_vec_pretty(&loaded.run)?,
    )?;

    info!(run_dir = %run_dir.display(), domain = %args.domain, "starting generation");

    let budget = ResourceBudget::new(&loaded.run.limits, Box::new(SystemMemoryProbe::new()));
    let mut sink = CsvSink::new(run_dir.clone());
    let mut orchestrator =
        RunOrchestrator::new(loaded.run, budget, Box::new(HeuristicEstimator));
    let outcome = orchestrator.run(domain, &mut sink)?;

    std::fs::write(
        run_dir.join("run_outcome.json"),
        serde_json::to_vec_pretty(&outcome)?,
    )?;

    for table in &outcome.tables {
        println!("{:>12} rows  {}", table.rows, table.table);
    }
    if outcome.aborted {
        println!(
            "aborted by resource budget at row {} of {}; confirmed output kept in {}",
            outcome.checkpoint.unwrap_or(0),
            outcome.events_total,
            run_dir.display()
        );
    } else {
        println!(
            "generated {} rows across {} tables in {} ms -> {}",
            outcome.rows_emitted,
            outcome.tables.len(),
            outcome.duration_ms,
            run_dir.display()
        );
    }

    Ok(())
}

fn run_estimate(args: EstimateArgs) -> Result<(), CliError> {
    let loaded = config_file::load(&args.config)?;
    validate_config(&loaded.run).map_err(|err| CliError::InvalidConfig(err.to_string()))?;

    let registry = builtin_registry(loaded.sales, loaded.run.chaos.global_seed);
    let domain = registry.get(&args.domain)?;

    let seeds = SeedDerivation::new(loaded.run.chaos.global_seed);
    let calendar = DemandCalendar::new(&loaded.run.demand, seeds, domain.name());
    let schedule = calendar
        .build(&loaded.run.window)
        .map_err(EngineError::from)?;
    let estimate = HeuristicEstimator.estimate(&schedule, domain);

    let report = serde_json::json!({
        "domain": args.domain,
        "days": schedule.len(),
        "events_total": schedule.total_rows(),
        "projected_rows": estimate.projected_rows,
        "projected_bytes": estimate.projected_bytes,
        "fits_output_ceiling": estimate.projected_bytes <= loaded.run.limits.max_output_bytes,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
