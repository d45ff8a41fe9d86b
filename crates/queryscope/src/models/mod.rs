pub mod advisory;
pub mod telemetry;

pub use advisory::{
    Alert, AlertKind, QueryLog, QueryRunResult, QueryStatus, Severity, Suggestion,
    SuggestionKind, json_schema,
};
pub use telemetry::{ExecutionPayload, PlanReport, RawTelemetry};
