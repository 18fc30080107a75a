use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "memdyn developers",
    version,
    about = "memdyn CLI - Relax and integrate the mechanics and protein chemistry of triangulated membranes.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel force evaluation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one integrator on a membrane mesh and write its trajectory.
    Run(RunArgs),
    /// Validate a run file and print the energy of the initial state.
    Check(CheckArgs),
}

/// Integration schemes selectable from the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegratorChoice {
    Euler,
    VelocityVerlet,
    ConjugateGradient,
    Bfgs,
}

/// Options shared by every subcommand that builds a membrane system.
#[derive(Args, Debug, Clone, Default)]
pub struct SystemArgs {
    /// Path to the run file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Physical parameter file, overriding the `[physics]` table of the run file.
    #[arg(short, long, value_name = "PATH")]
    pub parameters: Option<PathBuf>,

    /// Read the initial mesh from an OBJ file instead of generating one.
    #[arg(short, long, value_name = "PATH")]
    pub mesh: Option<PathBuf>,

    /// Seed of the DPD noise stream.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Set a specific configuration value, overriding the run file.
    /// Can be used multiple times. Example: -S integrator.time-step=0.01
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub system: SystemArgs,

    /// Directory receiving the trajectory CSV files.
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Also write the final state as an OBJ file.
    #[arg(long, value_name = "PATH")]
    pub final_mesh: Option<PathBuf>,

    // --- Integrator Overrides ---
    /// Override the integration scheme.
    #[arg(short, long, value_enum, value_name = "SCHEME")]
    pub integrator: Option<IntegratorChoice>,

    /// Override the characteristic time step.
    #[arg(short = 't', long, value_name = "FLOAT")]
    pub time_step: Option<f64>,

    /// Override the maximum number of steps.
    #[arg(short = 'n', long, value_name = "INT")]
    pub max_steps: Option<u64>,

    /// Override the convergence tolerance on the force norms.
    #[arg(long, value_name = "FLOAT")]
    pub tolerance: Option<f64>,

    /// Override the number of steps between trajectory frames.
    #[arg(long, value_name = "INT")]
    pub frame_period: Option<u64>,
}

/// Arguments for the `check` subcommand.
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub system: SystemArgs,
}
