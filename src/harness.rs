//! CLI entry point for the planning harness: plan a lowered toolpath from JSON
//! and print the planned segments as JSON.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

use toolpath_planner::{load_config, LineSegment, MotionPlanner, MoveCommand, PlannerConfig};

/// Planning Harness CLI
#[derive(Parser, Debug)]
#[command(name = "plan-harness", about = "Plan trapezoidal velocity profiles for a lowered toolpath.")]
pub struct Cli {
    /// Path to a TOML config file (overrides defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum log level written to stderr
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Plan a toolpath given as a JSON array of move commands
    Plan {
        /// JSON file with the move commands
        toolpath: PathBuf,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also emit the speed resampled every DT seconds
        #[arg(long, value_name = "DT")]
        sample_dt: Option<f64>,
    },
    /// Print the effective configuration as TOML
    ShowConfig,
}

#[derive(Serialize)]
struct PlanReport<'a> {
    duration: f64,
    length: f64,
    peak_velocity: f64,
    segments: &'a [LineSegment],
    #[serde(skip_serializing_if = "Option::is_none")]
    velocity_samples: Option<Vec<f64>>,
}

type HarnessError = Box<dyn std::error::Error + Send + Sync + 'static>;

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), HarnessError> {
    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)?
        }
        None => PlannerConfig::default(),
    };

    match &cli.command {
        Commands::ShowConfig => {
            print!("{}", toml::to_string(&config)?);
            Ok(())
        }
        Commands::Plan { toolpath, output, sample_dt } => {
            let planner = MotionPlanner::new_from_config(&config)?;
            let contents = std::fs::read_to_string(toolpath)?;
            let commands: Vec<MoveCommand> = serde_json::from_str(&contents)?;
            tracing::info!("Planning {} move commands from {}", commands.len(), toolpath.display());

            let trajectory = planner.plan(&commands)?;
            tracing::info!(
                "Planned {} segments: {:.3}mm in {:.3}s, peak {:.1}mm/s",
                trajectory.len(),
                trajectory.length(),
                trajectory.duration(),
                trajectory.peak_velocity()
            );

            let report = PlanReport {
                duration: trajectory.duration(),
                length: trajectory.length(),
                peak_velocity: trajectory.peak_velocity(),
                segments: trajectory.segments(),
                velocity_samples: sample_dt.map(|dt| trajectory.sample_velocity(dt)).transpose()?,
            };
            let json = serde_json::to_string_pretty(&report)?;
            match output {
                Some(path) => std::fs::write(path, json)?,
                None => println!("{}", json),
            }
            Ok(())
        }
    }
}
