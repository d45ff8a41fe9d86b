use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use crate::config::RuntimePaths;
use crate::estimator::{derive_alerts, estimate};
use crate::models::RawTelemetry;
use crate::utils::ids::{IdGenerator, UuidGenerator};
use crate::utils::time::{Clock, SystemClock};

#[derive(Debug, Clone, Args)]
pub struct EstimateArgs {
    /// JSON document shaped like `{"plan": {...}, "execution": {...}}`.
    #[arg(value_name = "TELEMETRY")]
    pub input: PathBuf,

    /// Client-measured wall time, used when the plan carries none.
    #[arg(long, default_value_t = 0.0)]
    pub elapsed_ms: f64,

    #[arg(long, value_name = "SQL", default_value = "")]
    pub sql: String,
}

pub fn run(args: &EstimateArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let input = runtime_paths.resolve(&args.input)?;
    let raw = std::fs::read_to_string(&input)
        .with_context(|| format!("failed to read telemetry file: {}", input.display()))?;
    let telemetry = serde_json::from_str::<RawTelemetry>(&raw)
        .with_context(|| format!("invalid telemetry JSON: {}", input.display()))?;

    let ids = UuidGenerator;
    let clock = SystemClock;
    let metrics = estimate(&telemetry, args.elapsed_ms);
    let log = metrics
        .clone()
        .into_query_log(ids.next_id(), &args.sql, clock.now_utc());
    let alerts = derive_alerts(&log, &ids, &clock);

    let encoded = serde_json::to_string_pretty(&json!({
        "metrics": metrics,
        "alerts": alerts,
    }))
    .context("failed to encode estimate")?;
    println!("{encoded}");

    Ok(())
}
