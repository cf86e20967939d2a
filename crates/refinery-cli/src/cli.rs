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
    author = "Refinery Developers",
    version,
    about = "Refinery CLI - Tabulated pair potentials, energies, forces and intramolecular Monte Carlo for atomistic models of disordered materials.",
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

    /// Set the number of threads (and process pool ranks) for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evolve a configuration: intramolecular shake, energy and forces, repeated per iteration.
    Run(RunArgs),
    /// Write the tabulated pair potentials of a configuration to disk.
    Export(ExportArgs),
    /// Run a single energy and force self-test pass against the serial reference.
    Test(TestArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the simulation input file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Override the number of iterations from the input file.
    #[arg(short = 'n', long, value_name = "INT")]
    pub iterations: Option<usize>,

    /// Override the random seed from the input file.
    #[arg(short, long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Restart file: loaded before the run if it exists, written after it.
    #[arg(short, long, value_name = "PATH")]
    pub restart: Option<PathBuf>,

    /// Directory receiving the energy log.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Stop as soon as the total energy is judged stable.
    #[arg(long)]
    pub until_stable: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// One column-oriented file per type pair, named `<output>-<I>-<J>.pp`.
    Block,
    /// A single DL_POLY `TABLE` file.
    Dlpoly,
}

/// Arguments for the `export` subcommand.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Path to the simulation input file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ExportFormat::Block)]
    pub format: ExportFormat,

    /// Output file (DL_POLY) or file name prefix (block).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,
}

/// Arguments for the `test` subcommand.
#[derive(Args, Debug)]
pub struct TestArgs {
    /// Path to the simulation input file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Compute the reference with the analytic potentials instead of the tables.
    #[arg(long)]
    pub analytic: bool,

    /// Override the energy test threshold (kJ/mol).
    #[arg(long, value_name = "FLOAT")]
    pub energy_threshold: Option<f64>,

    /// Override the force test threshold (percent).
    #[arg(long, value_name = "FLOAT")]
    pub force_threshold: Option<f64>,

    /// Skip the force test.
    #[arg(long)]
    pub no_forces: bool,
}
