use std::path::Path;

use anyhow::{Context, Result, anyhow};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::advisor::AdvisoryStore;
use crate::estimator::round2;
use crate::models::{
    Alert, AlertKind, PlanReport, QueryLog, QueryStatus, Severity, Suggestion, SuggestionKind,
};

pub const SQLITE_SCHEMA_VERSION: &str = "queryscope.advisor.sqlite.v1";
pub const QUERY_LOGS_TABLE: &str = "query_logs";
pub const SUGGESTIONS_TABLE: &str = "optimization_suggestions";
pub const ALERTS_TABLE: &str = "query_alerts";
pub const SCHEMA_META_TABLE: &str = "queryscope_schema_meta";
pub const DEFAULT_HISTORY_LIMIT: usize = 20;
pub const DEFAULT_TREND_LIMIT: usize = 10;

const CREATE_QUERY_LOGS_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS query_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    local_id TEXT NOT NULL,
    query_text TEXT NOT NULL,
    execution_time_ms REAL NOT NULL DEFAULT 0,
    cpu_usage_percent REAL NOT NULL DEFAULT 0,
    memory_usage_mb REAL NOT NULL DEFAULT 0,
    row_count INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL,
    error_message TEXT,
    execution_plan_json TEXT,
    created_at TEXT NOT NULL,
    CHECK (status IN ('success', 'error')),
    CHECK (execution_time_ms >= 0),
    CHECK (memory_usage_mb >= 0),
    CHECK (row_count >= 0)
);
"#;

const CREATE_INDEX_QUERY_LOGS_CREATED_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_query_logs_created
ON query_logs (created_at, id);
"#;

const CREATE_SUGGESTIONS_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS optimization_suggestions (
    id TEXT NOT NULL PRIMARY KEY,
    query_log_id INTEGER NOT NULL,
    suggestion_type TEXT NOT NULL,
    description TEXT NOT NULL,
    severity TEXT NOT NULL,
    ai_generated INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    CHECK (suggestion_type IN (
        'SELECT_STAR',
        'MISSING_WHERE',
        'OR_CONDITION',
        'LEADING_WILDCARD',
        'MISSING_LIMIT',
        'MULTIPLE_JOINS',
        'ORDER_WITHOUT_LIMIT',
        'DISTINCT_USAGE',
        'NOT_EQUAL_OPERATOR',
        'OFFSET_PAGINATION',
        'SUBQUERY_IN_WHERE'
    )),
    CHECK (severity IN ('low', 'medium', 'high')),
    CHECK (ai_generated IN (0, 1)),
    FOREIGN KEY(query_log_id) REFERENCES query_logs(id) ON DELETE CASCADE
);
"#;

const CREATE_INDEX_SUGGESTIONS_LOG_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_optimization_suggestions_log
ON optimization_suggestions (query_log_id);
"#;

const CREATE_ALERTS_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS query_alerts (
    id TEXT NOT NULL PRIMARY KEY,
    query_log_id INTEGER NOT NULL,
    alert_type TEXT NOT NULL,
    threshold_value REAL NOT NULL,
    actual_value REAL NOT NULL,
    created_at TEXT NOT NULL,
    CHECK (alert_type IN ('SLOW_QUERY', 'HIGH_MEMORY')),
    UNIQUE (query_log_id, alert_type),
    FOREIGN KEY(query_log_id) REFERENCES query_logs(id) ON DELETE CASCADE
);
"#;

const CREATE_META_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS queryscope_schema_meta (
    schema_version TEXT NOT NULL,
    applied_at_utc TEXT NOT NULL
);
"#;

#[must_use]
pub fn schema_statements() -> &'static [&'static str] {
    &[
        CREATE_QUERY_LOGS_TABLE_SQL,
        CREATE_INDEX_QUERY_LOGS_CREATED_SQL,
        CREATE_SUGGESTIONS_TABLE_SQL,
        CREATE_INDEX_SUGGESTIONS_LOG_SQL,
        CREATE_ALERTS_TABLE_SQL,
        CREATE_META_TABLE_SQL,
    ]
}

#[must_use]
pub fn create_schema_sql() -> String {
    schema_statements().join("\n")
}

pub fn open_sqlite_connection(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!(
                "failed to create sqlite parent directory: {}",
                parent.display()
            )
        })?;
    }

    let connection = Connection::open(path)
        .with_context(|| format!("failed to open sqlite database: {}", path.display()))?;
    connection
        .pragma_update(None, "foreign_keys", true)
        .context("failed to enable sqlite foreign keys")?;
    Ok(connection)
}

pub fn ensure_sqlite_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(&create_schema_sql())
        .context("failed to create sqlite schema")?;

    if schema_meta_has_version(connection, SQLITE_SCHEMA_VERSION)? {
        return Ok(());
    }

    let applied_at_utc = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("failed to format sqlite schema applied timestamp")?;
    connection
        .execute(
            &format!(
                "INSERT INTO {SCHEMA_META_TABLE} (schema_version, applied_at_utc) VALUES (?1, ?2)"
            ),
            params![SQLITE_SCHEMA_VERSION, applied_at_utc],
        )
        .context("failed to write sqlite schema meta row")?;

    Ok(())
}

fn schema_meta_has_version(connection: &Connection, schema_version: &str) -> Result<bool> {
    let query = format!(
        "SELECT EXISTS(SELECT 1 FROM {SCHEMA_META_TABLE} WHERE schema_version = ?1 LIMIT 1)"
    );
    let exists = connection
        .query_row(&query, [schema_version], |row| row.get::<usize, i64>(0))
        .context("failed to query sqlite schema version metadata")?;
    Ok(exists != 0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub total_queries: u64,
    pub successful_queries: u64,
    pub success_rate_percent: f64,
    pub avg_execution_time_ms: f64,
}

/// One successful run on the execution-time trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionTimePoint {
    pub log_id: String,
    pub execution_time_ms: f64,
    pub created_at: String,
}

/// Advisory history kept in a local SQLite file. Log ids are the table's
/// row ids, rendered as text.
pub struct SqliteStore {
    connection: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let connection = open_sqlite_connection(path)?;
        Self::from_connection(connection)
    }

    pub fn open_in_memory() -> Result<Self> {
        let connection =
            Connection::open_in_memory().context("failed to open in-memory sqlite store")?;
        Self::from_connection(connection)
    }

    pub fn from_connection(connection: Connection) -> Result<Self> {
        connection
            .pragma_update(None, "foreign_keys", true)
            .context("failed to enable sqlite foreign keys")?;
        ensure_sqlite_schema(&connection)?;
        Ok(Self { connection })
    }

    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Newest first.
    pub fn recent_logs(&self, limit: usize) -> Result<Vec<QueryLog>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut statement = self
            .connection
            .prepare(&format!(
                "SELECT id, query_text, execution_time_ms, cpu_usage_percent, memory_usage_mb,
                        row_count, status, error_message, created_at
                 FROM {QUERY_LOGS_TABLE}
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?1"
            ))
            .context("failed to prepare recent query log lookup")?;
        let rows = statement
            .query_map([limit], decode_log_row)
            .context("failed to query recent query logs")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to decode query log row")
    }

    pub fn find_log(&self, log_id: &str) -> Result<Option<QueryLog>> {
        let row_id = parse_log_id(log_id)?;
        self.connection
            .query_row(
                &format!(
                    "SELECT id, query_text, execution_time_ms, cpu_usage_percent, memory_usage_mb,
                            row_count, status, error_message, created_at
                     FROM {QUERY_LOGS_TABLE} WHERE id = ?1"
                ),
                [row_id],
                decode_log_row,
            )
            .optional()
            .with_context(|| format!("failed to load query log id={log_id}"))
    }

    pub fn execution_plan(&self, log_id: &str) -> Result<Option<PlanReport>> {
        let row_id = parse_log_id(log_id)?;
        let encoded = self
            .connection
            .query_row(
                &format!("SELECT execution_plan_json FROM {QUERY_LOGS_TABLE} WHERE id = ?1"),
                [row_id],
                |row| row.get::<usize, Option<String>>(0),
            )
            .optional()
            .with_context(|| format!("failed to load execution plan for id={log_id}"))?
            .flatten();
        encoded
            .map(|json| {
                serde_json::from_str::<PlanReport>(&json)
                    .context("failed to decode stored execution plan")
            })
            .transpose()
    }

    pub fn suggestions_for_log(&self, log_id: &str) -> Result<Vec<Suggestion>> {
        let row_id = parse_log_id(log_id)?;
        let mut statement = self
            .connection
            .prepare(&format!(
                "SELECT id, query_log_id, suggestion_type, description, severity, created_at
                 FROM {SUGGESTIONS_TABLE} WHERE query_log_id = ?1 ORDER BY rowid"
            ))
            .context("failed to prepare suggestion lookup")?;
        let rows = statement
            .query_map([row_id], |row| {
                Ok(Suggestion {
                    id: row.get(0)?,
                    query_log_id: row.get::<usize, i64>(1)?.to_string(),
                    suggestion_type: enum_column(row, 2, SuggestionKind::from_key)?,
                    description: row.get(3)?,
                    severity: enum_column(row, 4, Severity::from_key)?,
                    created_at: row.get(5)?,
                })
            })
            .context("failed to query suggestions")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to decode suggestion row")
    }

    pub fn alerts_for_log(&self, log_id: &str) -> Result<Vec<Alert>> {
        let row_id = parse_log_id(log_id)?;
        let mut statement = self
            .connection
            .prepare(&format!(
                "SELECT id, query_log_id, alert_type, threshold_value, actual_value, created_at
                 FROM {ALERTS_TABLE} WHERE query_log_id = ?1 ORDER BY rowid"
            ))
            .context("failed to prepare alert lookup")?;
        let rows = statement
            .query_map([row_id], |row| {
                Ok(Alert {
                    id: row.get(0)?,
                    query_log_id: row.get::<usize, i64>(1)?.to_string(),
                    alert_type: enum_column(row, 2, AlertKind::from_key)?,
                    threshold_value: row.get(3)?,
                    actual_value: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })
            .context("failed to query alerts")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to decode alert row")
    }

    /// Removes one log and its suggestions and alerts. Returns whether the
    /// log existed.
    pub fn delete_log(&self, log_id: &str) -> Result<bool> {
        let row_id = parse_log_id(log_id)?;
        let deleted = self
            .connection
            .execute(
                &format!("DELETE FROM {QUERY_LOGS_TABLE} WHERE id = ?1"),
                [row_id],
            )
            .with_context(|| format!("failed to delete query log id={log_id}"))?;
        Ok(deleted > 0)
    }

    pub fn clear_logs(&self) -> Result<usize> {
        self.connection
            .execute(&format!("DELETE FROM {QUERY_LOGS_TABLE}"), [])
            .context("failed to clear query logs")
    }

    /// Execution times of the latest `limit` successful runs, oldest first.
    pub fn recent_successful_times(&self, limit: usize) -> Result<Vec<ExecutionTimePoint>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut statement = self
            .connection
            .prepare(&format!(
                "SELECT id, execution_time_ms, created_at FROM (
                    SELECT id, execution_time_ms, created_at
                    FROM {QUERY_LOGS_TABLE}
                    WHERE status = 'success'
                    ORDER BY created_at DESC, id DESC
                    LIMIT ?1
                 )
                 ORDER BY created_at ASC, id ASC"
            ))
            .context("failed to prepare execution time trend lookup")?;
        let rows = statement
            .query_map([limit], |row| {
                Ok(ExecutionTimePoint {
                    log_id: row.get::<usize, i64>(0)?.to_string(),
                    execution_time_ms: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })
            .context("failed to query execution time trend")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to decode execution time trend row")
    }

    pub fn performance_summary(&self) -> Result<PerformanceSummary> {
        let (total, successful, avg_execution_time_ms) = self
            .connection
            .query_row(
                &format!(
                    "SELECT
                        COUNT(*),
                        COALESCE(SUM(CASE WHEN status = 'success' THEN 1 ELSE 0 END), 0),
                        COALESCE(AVG(CASE WHEN status = 'success' THEN execution_time_ms END), 0.0)
                     FROM {QUERY_LOGS_TABLE}"
                ),
                [],
                |row| {
                    Ok((
                        row.get::<usize, i64>(0)?,
                        row.get::<usize, i64>(1)?,
                        row.get::<usize, f64>(2)?,
                    ))
                },
            )
            .context("failed to compute performance summary")?;

        let total_queries = u64::try_from(total).unwrap_or(0);
        let successful_queries = u64::try_from(successful).unwrap_or(0);
        let success_rate_percent = if total_queries == 0 {
            0.0
        } else {
            round2(successful_queries as f64 / total_queries as f64 * 100.0)
        };

        Ok(PerformanceSummary {
            total_queries,
            successful_queries,
            success_rate_percent,
            avg_execution_time_ms: round2(avg_execution_time_ms),
        })
    }
}

impl AdvisoryStore for SqliteStore {
    fn insert_log(&self, log: &QueryLog, plan: Option<&PlanReport>) -> Result<Option<String>> {
        let plan_json = plan
            .map(serde_json::to_string)
            .transpose()
            .context("failed to encode execution plan")?;
        let row_count = i64::try_from(log.row_count)
            .map_err(|_| anyhow!("row_count exceeds sqlite INTEGER range"))?;

        self.connection
            .execute(
                &format!(
                    "INSERT INTO {QUERY_LOGS_TABLE} (
                        local_id, query_text, execution_time_ms, cpu_usage_percent,
                        memory_usage_mb, row_count, status, error_message,
                        execution_plan_json, created_at
                     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ),
                params![
                    log.id,
                    log.query_text,
                    log.execution_time_ms,
                    log.cpu_usage_percent,
                    log.memory_usage_mb,
                    row_count,
                    log.status.as_str(),
                    log.error_message,
                    plan_json,
                    log.created_at,
                ],
            )
            .with_context(|| format!("failed to insert query log local_id={}", log.id))?;

        Ok(Some(self.connection.last_insert_rowid().to_string()))
    }

    fn insert_suggestions(&self, suggestions: &[Suggestion]) -> Result<()> {
        let tx = self
            .connection
            .unchecked_transaction()
            .context("failed to open sqlite transaction")?;
        {
            let mut statement = tx
                .prepare_cached(&format!(
                    "INSERT INTO {SUGGESTIONS_TABLE} (
                        id, query_log_id, suggestion_type, description, severity,
                        ai_generated, created_at
                     ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)"
                ))
                .context("failed to prepare suggestion insert")?;
            for suggestion in suggestions {
                statement
                    .execute(params![
                        suggestion.id,
                        parse_log_id(&suggestion.query_log_id)?,
                        suggestion.suggestion_type.as_str(),
                        suggestion.description,
                        suggestion.severity.as_str(),
                        suggestion.created_at,
                    ])
                    .with_context(|| format!("failed to insert suggestion id={}", suggestion.id))?;
            }
        }
        tx.commit().context("failed to commit suggestions")
    }

    fn insert_alerts(&self, alerts: &[Alert]) -> Result<()> {
        let tx = self
            .connection
            .unchecked_transaction()
            .context("failed to open sqlite transaction")?;
        {
            let mut statement = tx
                .prepare_cached(&format!(
                    "INSERT INTO {ALERTS_TABLE} (
                        id, query_log_id, alert_type, threshold_value, actual_value, created_at
                     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
                ))
                .context("failed to prepare alert insert")?;
            for alert in alerts {
                statement
                    .execute(params![
                        alert.id,
                        parse_log_id(&alert.query_log_id)?,
                        alert.alert_type.as_str(),
                        alert.threshold_value,
                        alert.actual_value,
                        alert.created_at,
                    ])
                    .with_context(|| format!("failed to insert alert id={}", alert.id))?;
            }
        }
        tx.commit().context("failed to commit alerts")
    }
}

fn parse_log_id(log_id: &str) -> Result<i64> {
    log_id
        .trim()
        .parse::<i64>()
        .with_context(|| format!("query log id is not a store id: {log_id}"))
}

fn decode_log_row(row: &Row<'_>) -> rusqlite::Result<QueryLog> {
    Ok(QueryLog {
        id: row.get::<usize, i64>(0)?.to_string(),
        query_text: row.get(1)?,
        execution_time_ms: row.get(2)?,
        cpu_usage_percent: row.get(3)?,
        memory_usage_mb: row.get(4)?,
        row_count: u64::try_from(row.get::<usize, i64>(5)?).unwrap_or(0),
        status: enum_column(row, 6, QueryStatus::from_key)?,
        error_message: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn enum_column<T>(row: &Row<'_>, index: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw = row.get::<usize, String>(index)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            Type::Text,
            format!("unknown enum value `{raw}`").into(),
        )
    })
}
