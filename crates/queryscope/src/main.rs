#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;
use clap::error::ErrorKind;
use queryscope::cli::app::{Cli, Command, RuntimeArgs};
use queryscope::cli::commands;
use queryscope::config::{DEFAULT_LOG_FILTER, LOG_FILTER_ENV, RuntimePaths};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const EXIT_SUCCESS: i32 = 0;
const EXIT_RUNTIME_FAILURE: i32 = 1;
const EXIT_QUERY_FAILURE: i32 = 2;
const EXIT_USAGE_ERROR: i32 = 64;

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => return exit_code_for_parse_error(error),
    };
    init_logging();

    let command_name = command_name(&cli.command);
    info!(command = command_name, "starting");

    match execute(cli) {
        Ok(()) => {
            info!(command = command_name, exit_code = EXIT_SUCCESS, "completed");
            EXIT_SUCCESS
        }
        Err(failure) => {
            let exit_code = classify_runtime_error(&failure);
            error!(command = command_name, exit_code, "failed");
            eprintln!("queryscope: failed `{command_name}` (exit_code={exit_code})");
            eprintln!("{failure:#}");
            exit_code
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Analyze(args) => commands::analyze::run(&args),
        Command::Estimate(args) => {
            let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
            commands::estimate::run(&args, &runtime_paths)
        }
        Command::Run(args) => {
            let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
            commands::run::run(&args, &runtime_paths)
        }
        Command::History(args) => {
            let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
            commands::history::run(&args, &runtime_paths)
        }
        Command::Summary(args) => {
            let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
            commands::summary::run(&args, &runtime_paths)
        }
        Command::Schema(args) => commands::schema::run(&args),
    }
}

fn classify_runtime_error(error: &anyhow::Error) -> i32 {
    if error
        .downcast_ref::<commands::run::QueryRunFailure>()
        .is_some()
    {
        EXIT_QUERY_FAILURE
    } else {
        EXIT_RUNTIME_FAILURE
    }
}

fn exit_code_for_parse_error(error: clap::Error) -> i32 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = error.print();
            EXIT_SUCCESS
        }
        _ => {
            let _ = error.print();
            EXIT_USAGE_ERROR
        }
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Analyze(_) => "analyze",
        Command::Estimate(_) => "estimate",
        Command::Run(_) => "run",
        Command::History(_) => "history",
        Command::Summary(_) => "summary",
        Command::Schema(_) => "schema",
    }
}

fn resolve_runtime_paths(args: &RuntimeArgs) -> Result<RuntimePaths> {
    let home_dir = match &args.home_dir {
        Some(path) => path.clone(),
        None => std::env::var_os("HOME")
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("HOME is not set; pass --home-dir"))?,
    };

    let cwd = match &args.cwd {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };

    queryscope::config::resolve_runtime_paths(&home_dir, &cwd, args.data_dir.as_deref())
}
