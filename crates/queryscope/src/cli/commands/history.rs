use anyhow::{Context, Result, bail};
use clap::Args;
use serde_json::json;

use crate::config::RuntimePaths;
use crate::sqlite::{DEFAULT_HISTORY_LIMIT, SqliteStore};

#[derive(Debug, Clone, Args)]
pub struct HistoryArgs {
    #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
    pub limit: usize,

    /// Print one run with its suggestions, alerts and stored plan.
    #[arg(long, value_name = "ID", conflicts_with_all = ["delete", "clear"])]
    pub show: Option<String>,

    #[arg(long, value_name = "ID", conflicts_with = "clear")]
    pub delete: Option<String>,

    #[arg(long, default_value_t = false)]
    pub clear: bool,
}

pub fn run(args: &HistoryArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let store = SqliteStore::open(&runtime_paths.store_path())?;

    if args.clear {
        let removed = store.clear_logs()?;
        println!("history: cleared {removed} run(s)");
        return Ok(());
    }

    if let Some(log_id) = &args.delete {
        if !store.delete_log(log_id)? {
            bail!("no recorded run with id {log_id}");
        }
        println!("history: deleted run {log_id}");
        return Ok(());
    }

    let encoded = if let Some(log_id) = &args.show {
        let Some(log) = store.find_log(log_id)? else {
            bail!("no recorded run with id {log_id}");
        };
        serde_json::to_string_pretty(&json!({
            "log": log,
            "suggestions": store.suggestions_for_log(log_id)?,
            "alerts": store.alerts_for_log(log_id)?,
            "execution_plan": store.execution_plan(log_id)?,
        }))
    } else {
        serde_json::to_string_pretty(&store.recent_logs(args.limit)?)
    }
    .context("failed to encode history")?;
    println!("{encoded}");

    Ok(())
}
