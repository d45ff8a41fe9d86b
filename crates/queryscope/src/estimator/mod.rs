//! Heuristic conversion of planner/execution telemetry into dashboard
//! metrics. Nothing here measures the host; the numbers are a monotonic
//! surrogate derived from whatever the backend reported.

use serde::Serialize;

use crate::models::{Alert, AlertKind, PlanReport, QueryLog, QueryStatus, RawTelemetry};
use crate::utils::ids::IdGenerator;
use crate::utils::time::Clock;

pub const SLOW_QUERY_THRESHOLD_MS: f64 = 1_000.0;
pub const HIGH_MEMORY_THRESHOLD_MB: f64 = 100.0;

const PAGE_SIZE_KIB: f64 = 8.0;
const KIB_PER_MIB: f64 = 1_024.0;
const MB_PER_ROW: f64 = 0.001;
const FALLBACK_BASE_MEMORY_MB: f64 = 5.0;
const FALLBACK_SLOW_AFTER_MS: f64 = 500.0;
const FALLBACK_CPU_SLOW: f64 = 45.0;
const FALLBACK_CPU_FAST: f64 = 25.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimatedMetrics {
    pub execution_time_ms: f64,
    pub row_count: u64,
    pub cpu_usage_percent: f64,
    pub memory_usage_mb: f64,
    pub status: QueryStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl EstimatedMetrics {
    fn failed(message: &str) -> Self {
        Self {
            execution_time_ms: 0.0,
            row_count: 0,
            cpu_usage_percent: 0.0,
            memory_usage_mb: 0.0,
            status: QueryStatus::Error,
            error_message: Some(message.to_string()),
        }
    }

    #[must_use]
    pub fn into_query_log(
        self,
        id: impl Into<String>,
        query_text: impl Into<String>,
        created_at: impl Into<String>,
    ) -> QueryLog {
        QueryLog {
            id: id.into(),
            query_text: query_text.into(),
            execution_time_ms: self.execution_time_ms,
            cpu_usage_percent: self.cpu_usage_percent,
            memory_usage_mb: self.memory_usage_mb,
            row_count: self.row_count,
            status: self.status,
            error_message: self.error_message,
            created_at: created_at.into(),
        }
    }
}

#[must_use]
pub fn estimate(telemetry: &RawTelemetry, client_elapsed_ms: f64) -> EstimatedMetrics {
    if let Some(message) = telemetry.first_error() {
        return EstimatedMetrics::failed(message);
    }

    let client_elapsed_ms = client_elapsed_ms.max(0.0);
    let execution_row_count = telemetry
        .execution
        .as_ref()
        .and_then(|execution| execution.row_count);

    let (execution_time_ms, row_count, cpu_usage_percent, memory_usage_mb) =
        match (telemetry.usable_plan(), &telemetry.execution) {
            (Some(plan), _) => {
                // Zero readings from the planner are treated as missing.
                let execution_time_ms = plan
                    .execution_time_ms
                    .filter(|time| *time > 0.0)
                    .unwrap_or(client_elapsed_ms);
                let row_count = plan
                    .actual_rows
                    .filter(|rows| *rows > 0)
                    .or(execution_row_count)
                    .unwrap_or(0);
                (
                    execution_time_ms,
                    row_count,
                    cpu_from_execution_time(execution_time_ms),
                    memory_from_plan(plan, row_count),
                )
            }
            (None, Some(_)) => {
                let row_count = execution_row_count.unwrap_or(0);
                let cpu_usage_percent = if client_elapsed_ms > FALLBACK_SLOW_AFTER_MS {
                    FALLBACK_CPU_SLOW
                } else {
                    FALLBACK_CPU_FAST
                };
                (
                    client_elapsed_ms,
                    row_count,
                    cpu_usage_percent,
                    row_megabytes(row_count) + FALLBACK_BASE_MEMORY_MB,
                )
            }
            (None, None) => (client_elapsed_ms, 0, 0.0, 0.0),
        };

    EstimatedMetrics {
        execution_time_ms: round2(execution_time_ms),
        row_count,
        cpu_usage_percent: round2(cpu_usage_percent),
        memory_usage_mb: round2(memory_usage_mb),
        status: QueryStatus::Success,
        error_message: None,
    }
}

/// Piecewise-linear CPU surrogate: 10-30% under 100ms, 30-60% up to 500ms,
/// then 60% plus up to 30 more, reached at 1.5s.
#[must_use]
pub fn cpu_from_execution_time(execution_time_ms: f64) -> f64 {
    if execution_time_ms < 100.0 {
        10.0 + (execution_time_ms / 100.0) * 20.0
    } else if execution_time_ms < 500.0 {
        30.0 + ((execution_time_ms - 100.0) / 400.0) * 30.0
    } else {
        60.0 + (((execution_time_ms - 500.0) / 1_000.0) * 30.0).min(30.0)
    }
}

#[must_use]
pub fn memory_from_plan(plan: &PlanReport, row_count: u64) -> f64 {
    let blocks = plan.shared_hit_blocks.unwrap_or(0) + plan.shared_read_blocks.unwrap_or(0);
    let buffer_mb = (blocks as f64 * PAGE_SIZE_KIB) / KIB_PER_MIB;
    let cost_mb = plan.total_cost.unwrap_or(0.0).max(0.0) / 1_000.0;
    row_megabytes(row_count) + buffer_mb + cost_mb
}

fn row_megabytes(row_count: u64) -> f64 {
    row_count as f64 * MB_PER_ROW
}

#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Threshold alerts for a finished run. Failed runs never alert, and each
/// kind fires at most once.
#[must_use]
pub fn derive_alerts(log: &QueryLog, ids: &dyn IdGenerator, clock: &dyn Clock) -> Vec<Alert> {
    if !log.is_success() {
        return Vec::new();
    }

    let checks = [
        (
            AlertKind::SlowQuery,
            SLOW_QUERY_THRESHOLD_MS,
            log.execution_time_ms,
        ),
        (
            AlertKind::HighMemory,
            HIGH_MEMORY_THRESHOLD_MB,
            log.memory_usage_mb,
        ),
    ];

    checks
        .into_iter()
        .filter(|(_, threshold, observed)| observed > threshold)
        .map(|(alert_type, threshold_value, actual_value)| Alert {
            id: ids.next_id(),
            query_log_id: log.id.clone(),
            alert_type,
            threshold_value,
            actual_value: round2(actual_value),
            created_at: clock.now_utc(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{cpu_from_execution_time, round2};

    #[test]
    fn cpu_curve_is_continuous_at_breakpoints() {
        assert_eq!(cpu_from_execution_time(0.0), 10.0);
        assert_eq!(cpu_from_execution_time(100.0), 30.0);
        assert_eq!(cpu_from_execution_time(500.0), 60.0);
        assert_eq!(cpu_from_execution_time(1_500.0), 90.0);
        assert_eq!(cpu_from_execution_time(60_000.0), 90.0);
    }

    #[test]
    fn cpu_curve_is_monotonic() {
        let mut previous = cpu_from_execution_time(0.0);
        for step in 1..400 {
            let current = cpu_from_execution_time(f64::from(step) * 5.0);
            assert!(current >= previous, "curve dropped at step {step}");
            previous = current;
        }
    }

    #[test]
    fn rounds_half_up_to_two_decimals() {
        assert_eq!(round2(1.005_000_1), 1.01);
        assert_eq!(round2(12.344), 12.34);
        assert_eq!(round2(0.0), 0.0);
    }
}
