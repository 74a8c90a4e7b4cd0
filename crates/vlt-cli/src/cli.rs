//! Command-line interface definition.

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;
use vlt_algo::GroupOrder;

#[derive(Parser, Debug)]
#[command(author, version, about = "Finished-vehicle logistics planner", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Plan a dataset's realisations and write solution artifacts
    Plan(PlanArgs),
    /// Check a solution artifact against the planner invariants
    Verify(VerifyArgs),
    /// Evaluate a solution artifact: objective and metrics
    Evaluate(EvaluateArgs),
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args, Debug)]
pub struct PlanArgs {
    /// Dataset directory (vehicle_data.csv, planned/realised capacity files)
    #[arg(long)]
    pub dataset: PathBuf,

    /// Output directory for per-realisation artifacts and the manifest
    #[arg(long, short)]
    pub out: PathBuf,

    /// Solver to run
    #[arg(long, value_enum, default_value_t = SolverKind::Flow)]
    pub solver: SolverKind,

    /// Plan once with full hindsight instead of rolling day by day
    #[arg(long)]
    pub deterministic: bool,

    /// Realisation indices to plan (default: all found in the dataset)
    #[arg(long, value_delimiter = ',')]
    pub dataset_indices: Vec<usize>,

    /// Quantile-replacement derating of planned capacities (0 disables)
    #[arg(long, default_value_t = 0.0)]
    pub quantile: f64,

    /// Stddev-subtraction derating factor for planned capacities (0 disables)
    #[arg(long, default_value_t = 0.0)]
    pub stddev_factor: f64,

    /// Commodity processing order
    #[arg(long, value_enum, default_value_t = OrderKind::Ascending)]
    pub group_order: OrderKind,

    /// Worker threads for the realisation fan-out (0 = one per CPU)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,
}

#[derive(clap::Args, Debug)]
pub struct VerifyArgs {
    /// Solution artifact to check
    #[arg(long)]
    pub artifact: PathBuf,

    /// Dataset directory the artifact was planned from
    #[arg(long)]
    pub dataset: PathBuf,

    /// Realised-capacity file the run used
    #[arg(long, default_value = "realised_capacity_data_001.csv")]
    pub realised_file: String,
}

#[derive(clap::Args, Debug)]
pub struct EvaluateArgs {
    /// Solution artifact to evaluate
    #[arg(long)]
    pub artifact: PathBuf,

    /// Dataset directory the artifact was planned from
    #[arg(long)]
    pub dataset: PathBuf,

    /// Realised-capacity file the run used
    #[arg(long, default_value = "realised_capacity_data_001.csv")]
    pub realised_file: String,

    /// Days to trim from the front of the availability window
    #[arg(long, default_value_t = 0)]
    pub front_horizon: i32,

    /// Days to trim from the back of the availability window
    #[arg(long, default_value_t = 0)]
    pub back_horizon: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SolverKind {
    /// Sequential per-commodity integer min-cost flow
    Flow,
    /// Joint multi-commodity integer program (validation; needs the `mip`
    /// build feature)
    Mip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OrderKind {
    Unspecified,
    Ascending,
    Descending,
}

impl From<OrderKind> for GroupOrder {
    fn from(kind: OrderKind) -> GroupOrder {
        match kind {
            OrderKind::Unspecified => GroupOrder::Unspecified,
            OrderKind::Ascending => GroupOrder::Ascending,
            OrderKind::Descending => GroupOrder::Descending,
        }
    }
}
