//! SWARM SIM: Monte Carlo driver for range-only swarm localization.
//!
//! Every iteration places a fresh random swarm, elects a leader, builds the leader's local frame
//! from noisy ranges, multilaterates the remaining agents and scores the result against ground
//! truth. The run summary is logged and, when an output directory is given, every trial is
//! exported to CSV.
//!
//! You can run simulations either by:
//!   1. Loading all parameters from a configuration file (TOML/JSON/YAML)
//!   2. Specifying parameters via command-line flags

mod common;
mod report;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use common::{LogLevel, RunConfig, init_logger, validate_output_path};
use log::info;
use swarmloc::{SimulationConfig, run_simulation};

const LONG_ABOUT: &str = "SWARM SIM: Monte Carlo driver for range-only swarm localization.

Each iteration places a fresh random swarm, elects the best-connected agent as leader, anchors a
local frame on the leader and its two nearest neighbors using noisy ranges, and multilaterates
every other agent in that frame. Position and pairwise-distance mean squared errors are reported
against ground truth.

You can run simulations either by:
  1. Loading all parameters from a configuration file (TOML/JSON/YAML)
  2. Specifying parameters via command-line flags";

/// Command line arguments
#[derive(Parser)]
#[command(author, version, about = "Monte Carlo driver for range-only swarm localization.", long_about = LONG_ABOUT)]
struct Cli {
    /// Run simulation from a configuration file (TOML/JSON/YAML)
    /// This option overrides any subcommand arguments
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Command to execute (ignored if --config is provided)
    #[command(subcommand)]
    command: Option<Command>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevel>,

    /// Log file path (if not specified, logs to stderr)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Solve multilateration in parallel
    #[arg(long, global = true)]
    parallel: bool,
}

/// Top-level commands
#[derive(Subcommand, Clone)]
enum Command {
    #[command(name = "run", about = "Run a simulation from command-line parameters")]
    Run(RunArgs),

    #[command(name = "config", about = "Write a template configuration file")]
    CreateConfig(CreateConfigArgs),
}

/// Simulation parameters
#[derive(Args, Clone, Debug)]
struct RunArgs {
    /// Number of agents per swarm (at least 3)
    #[arg(short = 'n', long, default_value_t = 15)]
    num_agents: usize,

    /// Neighbor discovery radius
    #[arg(short = 'r', long, default_value_t = 2.0)]
    communication_range: f64,

    /// Standard deviation of the noise added to squared ranges
    #[arg(short = 's', long, default_value_t = 0.1)]
    std_noise: f64,

    /// Number of trials
    #[arg(short = 'i', long, default_value_t = 5)]
    iterations: usize,

    /// RNG seed (random if omitted; the seed used is logged)
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum distance at which anchors can range an agent
    #[arg(long)]
    ranging_range: Option<f64>,

    /// Directory for trials.csv and positions.csv
    #[arg(short, long, value_parser)]
    output: Option<PathBuf>,
}

impl RunArgs {
    fn to_config(&self) -> RunConfig {
        RunConfig {
            output: self.output.as_ref().map(|p| p.display().to_string()),
            simulation: SimulationConfig {
                num_agents: self.num_agents,
                communication_range: self.communication_range,
                std_noise: self.std_noise,
                num_iterations: self.iterations,
                seed: self.seed,
                ranging_range: self.ranging_range,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Arguments for the config command
#[derive(Args, Clone, Debug)]
struct CreateConfigArgs {
    /// Output file path for the config file
    /// File extension determines format: .json, .yaml/.yml, or .toml (recommended)
    #[arg(short, long, value_parser)]
    output: PathBuf,
}

/// Runs the simulation described by `config` and exports the records.
fn execute(config: &RunConfig) -> Result<()> {
    // Configuration errors are fatal before any trial runs.
    config.simulation.validate()?;
    let output = config.output.as_deref().map(Path::new);
    if let Some(dir) = output {
        validate_output_path(dir)?;
    }

    let result = run_simulation(&config.simulation)?;
    info!("Seed: {}", result.seed);
    report::log_summary(&result.statistics);

    if let Some(dir) = output {
        report::write_records(&result.records, dir)
            .with_context(|| format!("Failed to write results to '{}'", dir.display()))?;
    }
    Ok(())
}

fn create_config_file(args: &CreateConfigArgs) -> Result<()> {
    let template = RunConfig {
        output: Some("output".to_string()),
        simulation: SimulationConfig {
            seed: Some(42),
            ..Default::default()
        },
        ..Default::default()
    };
    template.to_file(&args.output)?;
    info!("Template configuration written to {}", args.output.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match (&cli.config, &cli.command) {
        (Some(path), _) => RunConfig::from_file(path)?,
        (None, Some(Command::Run(args))) => args.to_config(),
        (None, Some(Command::CreateConfig(args))) => {
            init_logger(cli.log_level.unwrap_or_default().as_str(), cli.log_file.as_ref())?;
            return create_config_file(args);
        }
        (None, None) => {
            eprintln!("Error: No command provided. Use -h or --help for usage information.");
            std::process::exit(1);
        }
    };

    // CLI flags take precedence over the file
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.parallel {
        config.simulation.parallel = true;
    }
    let config_log_file = config.logging.file.as_ref().map(PathBuf::from);
    let log_file = cli.log_file.as_ref().or(config_log_file.as_ref());
    init_logger(config.logging.level.as_str(), log_file)?;

    if let Some(path) = &cli.config {
        info!("Configuration loaded from {}", path.display());
    }
    execute(&config)
}
