use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::warn;

use crate::advisor::{Advisor, AdvisoryStore, DiscardStore};
use crate::backend::{DEFAULT_ROW_CAP, SqliteBackend};
use crate::config::RuntimePaths;
use crate::sqlite::SqliteStore;

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[arg(value_name = "SQL")]
    pub sql: String,

    /// SQLite database the query runs against.
    #[arg(long, value_name = "PATH")]
    pub target: PathBuf,

    #[arg(long, default_value_t = false)]
    pub read_only: bool,

    #[arg(long, default_value_t = DEFAULT_ROW_CAP)]
    pub row_cap: usize,

    /// Skip recording the run in the advisory store.
    #[arg(long, default_value_t = false)]
    pub no_store: bool,
}

/// The query ran but its log carries status=error.
#[derive(Debug)]
pub struct QueryRunFailure {
    pub log_id: String,
    pub message: String,
}

impl std::fmt::Display for QueryRunFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "query failed (log_id={}): {}", self.log_id, self.message)
    }
}

impl std::error::Error for QueryRunFailure {}

pub fn run(args: &RunArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let target = runtime_paths.resolve(&args.target)?;
    let backend = SqliteBackend::new(target)
        .read_only(args.read_only)
        .row_cap(args.row_cap);
    let store = open_store(args, runtime_paths);

    let result = Advisor::new(&backend, store.as_ref()).run(&args.sql);

    let encoded = serde_json::to_string_pretty(&result).context("failed to encode run result")?;
    println!("{encoded}");

    if !result.log.is_success() {
        return Err(QueryRunFailure {
            log_id: result.log.id.clone(),
            message: result.log.error_message.clone().unwrap_or_default(),
        }
        .into());
    }

    Ok(())
}

fn open_store(args: &RunArgs, runtime_paths: &RuntimePaths) -> Box<dyn AdvisoryStore> {
    if args.no_store {
        return Box::new(DiscardStore);
    }

    let store_path = runtime_paths.store_path();
    match SqliteStore::open(&store_path) {
        Ok(store) => Box::new(store),
        Err(error) => {
            warn!(
                store = %store_path.display(),
                error = %format!("{error:#}"),
                "advisory store unavailable; run will not be recorded"
            );
            Box::new(DiscardStore)
        }
    }
}
