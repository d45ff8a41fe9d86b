use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use crate::config::RuntimePaths;
use crate::sqlite::{DEFAULT_TREND_LIMIT, SqliteStore};

#[derive(Debug, Clone, Args)]
pub struct SummaryArgs {
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Number of recent successful runs on the execution-time trend.
    #[arg(long, default_value_t = DEFAULT_TREND_LIMIT)]
    pub trend: usize,
}

pub fn run(args: &SummaryArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let store = SqliteStore::open(&runtime_paths.store_path())?;
    let summary = store.performance_summary()?;
    let trend = store.recent_successful_times(args.trend)?;

    if args.json {
        let encoded = serde_json::to_string_pretty(&json!({
            "summary": summary,
            "recent_execution_times": trend,
        }))
        .context("failed to encode summary")?;
        println!("{encoded}");
        return Ok(());
    }

    println!("summary: total_queries={}", summary.total_queries);
    println!("summary: successful_queries={}", summary.successful_queries);
    println!("summary: success_rate={:.2}%", summary.success_rate_percent);
    println!("summary: avg_execution_time={}", format_duration(summary.avg_execution_time_ms));
    for point in &trend {
        println!(
            "trend: log_id={} execution_time={} at={}",
            point.log_id,
            format_duration(point.execution_time_ms),
            point.created_at
        );
    }
    Ok(())
}

fn format_duration(execution_time_ms: f64) -> String {
    if execution_time_ms < 1_000.0 {
        format!("{execution_time_ms:.0}ms")
    } else {
        format!("{:.2}s", execution_time_ms / 1_000.0)
    }
}
