//! One advisory cycle per submitted query: fetch telemetry, estimate, persist
//! the log, scan, derive alerts, persist children, hand the record back.
//!
//! Execution problems become an error-status [`QueryLog`]; storage problems
//! are logged and otherwise ignored.

use std::fmt::{Display, Formatter};
use std::time::Instant;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::estimator::{derive_alerts, estimate};
use crate::models::{
    Alert, ExecutionPayload, PlanReport, QueryLog, QueryRunResult, RawTelemetry, Suggestion,
};
use crate::scanner::{rebind_suggestions, scan_with};
use crate::utils::ids::{IdGenerator, UuidGenerator};
use crate::utils::time::{Clock, SystemClock};

/// Where queries actually run. `explain` returns `Ok(None)` when the backend
/// has no planner statistics to offer.
pub trait ExecutionBackend {
    fn explain(&self, sql: &str) -> Result<Option<PlanReport>>;
    fn execute(&self, sql: &str) -> Result<ExecutionPayload>;
}

/// Where finished runs are recorded.
pub trait AdvisoryStore {
    /// Returns the store's own id for the log when it assigns one.
    fn insert_log(&self, log: &QueryLog, plan: Option<&PlanReport>) -> Result<Option<String>>;
    fn insert_suggestions(&self, suggestions: &[Suggestion]) -> Result<()>;
    fn insert_alerts(&self, alerts: &[Alert]) -> Result<()>;
}

/// Store used when persistence is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardStore;

impl AdvisoryStore for DiscardStore {
    fn insert_log(&self, _log: &QueryLog, _plan: Option<&PlanReport>) -> Result<Option<String>> {
        Ok(None)
    }

    fn insert_suggestions(&self, _suggestions: &[Suggestion]) -> Result<()> {
        Ok(())
    }

    fn insert_alerts(&self, _alerts: &[Alert]) -> Result<()> {
        Ok(())
    }
}

/// Raised by a backend that cannot be reached at all. Unlike statement
/// errors it aborts the whole cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendUnavailable {
    pub detail: String,
}

impl Display for BackendUnavailable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "execution backend unavailable: {}", self.detail)
    }
}

impl std::error::Error for BackendUnavailable {}

pub struct Advisor<'a> {
    backend: &'a dyn ExecutionBackend,
    store: &'a dyn AdvisoryStore,
    ids: &'a dyn IdGenerator,
    clock: &'a dyn Clock,
}

impl<'a> Advisor<'a> {
    #[must_use]
    pub fn new(backend: &'a dyn ExecutionBackend, store: &'a dyn AdvisoryStore) -> Self {
        Self {
            backend,
            store,
            ids: &UuidGenerator,
            clock: &SystemClock,
        }
    }

    #[must_use]
    pub fn with_ids(mut self, ids: &'a dyn IdGenerator) -> Self {
        self.ids = ids;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: &'a dyn Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn run(&self, query_text: &str) -> QueryRunResult {
        let started = Instant::now();
        match self.collect_telemetry(query_text) {
            Ok(telemetry) => {
                let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;
                self.complete_run(query_text, &telemetry, elapsed_ms)
            }
            Err(error) => self.abort_run(query_text, &error),
        }
    }

    fn collect_telemetry(&self, sql: &str) -> Result<RawTelemetry> {
        let mut telemetry = RawTelemetry::default();

        match self.backend.explain(sql) {
            Ok(plan) => telemetry.plan = plan,
            Err(error) if is_unavailable(&error) => return Err(error),
            Err(error) => {
                debug!(error = %format!("{error:#}"), "plan fetch failed");
                telemetry.plan_error = Some(format!("{error:#}"));
            }
        }

        match self.backend.execute(sql) {
            Ok(execution) => telemetry.execution = Some(execution),
            Err(error) if is_unavailable(&error) => return Err(error),
            Err(error) => {
                debug!(error = %format!("{error:#}"), "execution failed");
                telemetry.execution_error = Some(format!("{error:#}"));
            }
        }

        Ok(telemetry)
    }

    fn complete_run(
        &self,
        query_text: &str,
        telemetry: &RawTelemetry,
        elapsed_ms: f64,
    ) -> QueryRunResult {
        let metrics = estimate(telemetry, elapsed_ms);
        let mut log =
            metrics.into_query_log(self.ids.next_id(), query_text, self.clock.now_utc());
        log.id = self.persist_log(&log, telemetry.plan.as_ref());

        let suggestions = if log.is_success() {
            let mut suggestions = scan_with(self.ids, self.clock, query_text);
            rebind_suggestions(&mut suggestions, &log.id);
            if !suggestions.is_empty() {
                if let Err(error) = self.store.insert_suggestions(&suggestions) {
                    warn!(log_id = %log.id, error = %format!("{error:#}"), "failed to persist suggestions");
                }
            }
            suggestions
        } else {
            Vec::new()
        };

        let alerts = derive_alerts(&log, self.ids, self.clock);
        if !alerts.is_empty() {
            if let Err(error) = self.store.insert_alerts(&alerts) {
                warn!(log_id = %log.id, error = %format!("{error:#}"), "failed to persist alerts");
            }
        }

        info!(
            log_id = %log.id,
            status = log.status.as_str(),
            execution_time_ms = log.execution_time_ms,
            suggestions = suggestions.len(),
            alerts = alerts.len(),
            "query advisory complete"
        );

        QueryRunResult {
            log,
            suggestions,
            alerts,
        }
    }

    fn abort_run(&self, query_text: &str, error: &anyhow::Error) -> QueryRunResult {
        warn!(error = %format!("{error:#}"), "query run aborted before telemetry was collected");
        let mut log = QueryLog::failed(
            self.ids.next_id(),
            query_text,
            format!("{error:#}"),
            self.clock.now_utc(),
        );
        log.id = self.persist_log(&log, None);

        QueryRunResult {
            log,
            suggestions: Vec::new(),
            alerts: Vec::new(),
        }
    }

    /// Canonical id for `log`: the store's id when it hands one back, the
    /// local one otherwise.
    fn persist_log(&self, log: &QueryLog, plan: Option<&PlanReport>) -> String {
        match self.store.insert_log(log, plan) {
            Ok(Some(assigned)) if !assigned.is_empty() => {
                debug!(local_id = %log.id, assigned_id = %assigned, "store assigned log id");
                assigned
            }
            Ok(_) => log.id.clone(),
            Err(error) => {
                warn!(log_id = %log.id, error = %format!("{error:#}"), "failed to persist query log");
                log.id.clone()
            }
        }
    }
}

fn is_unavailable(error: &anyhow::Error) -> bool {
    error.downcast_ref::<BackendUnavailable>().is_some()
}
