use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use super::commands::{
    analyze::AnalyzeArgs, estimate::EstimateArgs, history::HistoryArgs, run::RunArgs,
    schema::SchemaArgs, summary::SummaryArgs,
};

#[derive(Debug, Parser)]
#[command(name = "queryscope", version, about = "Local SQL query advisor and cost estimator")]
pub struct Cli {
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct RuntimeArgs {
    #[arg(long, global = true, value_name = "PATH")]
    pub home_dir: Option<PathBuf>,

    #[arg(long, global = true, value_name = "PATH")]
    pub cwd: Option<PathBuf>,

    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan SQL text for anti-patterns without running it.
    Analyze(AnalyzeArgs),
    /// Turn a telemetry JSON document into metrics and alerts.
    Estimate(EstimateArgs),
    /// Run SQL against a SQLite database and record the advisory result.
    Run(RunArgs),
    /// List, inspect or delete recorded runs.
    History(HistoryArgs),
    /// Aggregate statistics over recorded runs.
    Summary(SummaryArgs),
    /// Print the JSON Schema of a run result.
    Schema(SchemaArgs),
}
