use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder owner id carried by suggestions and alerts until the caller
/// rebinds them to a persisted query log.
pub const UNBOUND_QUERY_LOG_ID: &str = "unbound";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuggestionKind {
    SelectStar,
    MissingWhere,
    OrCondition,
    LeadingWildcard,
    MissingLimit,
    MultipleJoins,
    OrderWithoutLimit,
    DistinctUsage,
    NotEqualOperator,
    OffsetPagination,
    SubqueryInWhere,
}

impl SuggestionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SelectStar => "SELECT_STAR",
            Self::MissingWhere => "MISSING_WHERE",
            Self::OrCondition => "OR_CONDITION",
            Self::LeadingWildcard => "LEADING_WILDCARD",
            Self::MissingLimit => "MISSING_LIMIT",
            Self::MultipleJoins => "MULTIPLE_JOINS",
            Self::OrderWithoutLimit => "ORDER_WITHOUT_LIMIT",
            Self::DistinctUsage => "DISTINCT_USAGE",
            Self::NotEqualOperator => "NOT_EQUAL_OPERATOR",
            Self::OffsetPagination => "OFFSET_PAGINATION",
            Self::SubqueryInWhere => "SUBQUERY_IN_WHERE",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        crate::scanner::RULE_ORDER
            .iter()
            .copied()
            .find(|kind| kind.as_str() == key)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    SlowQuery,
    HighMemory,
}

impl AlertKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SlowQuery => "SLOW_QUERY",
            Self::HighMemory => "HIGH_MEMORY",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "SLOW_QUERY" => Some(Self::SlowQuery),
            "HIGH_MEMORY" => Some(Self::HighMemory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Success,
    Error,
}

impl QueryStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "success" => Some(Self::Success),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Suggestion {
    pub id: String,
    pub query_log_id: String,
    pub suggestion_type: SuggestionKind,
    pub description: String,
    pub severity: Severity,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Alert {
    pub id: String,
    pub query_log_id: String,
    pub alert_type: AlertKind,
    pub threshold_value: f64,
    pub actual_value: f64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QueryLog {
    pub id: String,
    pub query_text: String,
    pub execution_time_ms: f64,
    pub cpu_usage_percent: f64,
    pub memory_usage_mb: f64,
    pub row_count: u64,
    pub status: QueryStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    pub created_at: String,
}

impl QueryLog {
    /// Terminal shape for a run that never produced telemetry.
    #[must_use]
    pub fn failed(
        id: impl Into<String>,
        query_text: impl Into<String>,
        error_message: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            query_text: query_text.into(),
            execution_time_ms: 0.0,
            cpu_usage_percent: 0.0,
            memory_usage_mb: 0.0,
            row_count: 0,
            status: QueryStatus::Error,
            error_message: Some(error_message.into()),
            created_at: created_at.into(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QueryRunResult {
    pub log: QueryLog,
    pub suggestions: Vec<Suggestion>,
    pub alerts: Vec<Alert>,
}

#[must_use]
pub fn json_schema() -> Value {
    let schema = schemars::schema_for!(QueryRunResult);
    match serde_json::to_value(schema) {
        Ok(value) => value,
        Err(error) => {
            panic!("failed to serialize generated query run result schema: {error}");
        }
    }
}
