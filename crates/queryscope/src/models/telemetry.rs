use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Planner statistics for one statement. Every field is optional because
/// backends report different subsets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_rows: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_hit_blocks: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_read_blocks: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPayload {
    #[serde(default)]
    pub rows: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything the estimator gets to see about one run. `*_error` holds the
/// failure of the collaborator call itself, as opposed to errors embedded in
/// a payload that did come back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTelemetry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanReport>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionPayload>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_error: Option<String>,
}

impl PlanReport {
    /// A plan that came back carrying its own error has no usable statistics.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.error
            .as_deref()
            .is_none_or(|message| message.trim().is_empty())
    }
}

impl RawTelemetry {
    /// First non-empty error signal: plan call, execution call, then execution
    /// payload. An error inside a returned plan only disqualifies the plan.
    #[must_use]
    pub fn first_error(&self) -> Option<&str> {
        [
            self.plan_error.as_deref(),
            self.execution_error.as_deref(),
            self.execution
                .as_ref()
                .and_then(|execution| execution.error.as_deref()),
        ]
        .into_iter()
        .flatten()
        .find(|message| !message.trim().is_empty())
    }

    /// The plan, when one came back without an embedded error.
    #[must_use]
    pub fn usable_plan(&self) -> Option<&PlanReport> {
        self.plan.as_ref().filter(|plan| plan.is_usable())
    }
}
