use std::path::{Path, PathBuf};

use anyhow::{Error, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OpenFlags, Statement};
use serde_json::{Value, json};
use tracing::debug;

use crate::advisor::{BackendUnavailable, ExecutionBackend};
use crate::models::{ExecutionPayload, PlanReport};

pub const DEFAULT_ROW_CAP: usize = 1_000;

/// Runs queries against a local SQLite file. SQLite has no EXPLAIN ANALYZE,
/// so plans carry the VDBE program length as their cost and no timing.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    path: PathBuf,
    read_only: bool,
    row_cap: usize,
}

impl SqliteBackend {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            read_only: false,
            row_cap: DEFAULT_ROW_CAP,
        }
    }

    #[must_use]
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    #[must_use]
    pub fn row_cap(mut self, row_cap: usize) -> Self {
        self.row_cap = row_cap.max(1);
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        if !self.path.is_file() {
            return Err(Error::new(BackendUnavailable {
                detail: format!("target database not found: {}", self.path.display()),
            }));
        }

        let flags = if self.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
        };
        Connection::open_with_flags(&self.path, flags).map_err(|error| {
            Error::new(BackendUnavailable {
                detail: format!("{}: {error}", self.path.display()),
            })
        })
    }
}

impl ExecutionBackend for SqliteBackend {
    fn explain(&self, sql: &str) -> Result<Option<PlanReport>> {
        let connection = self.connect()?;

        let details = match query_plan_details(&connection, sql) {
            Ok(details) => details,
            Err(error) => {
                debug!(error = %error, "explain query plan rejected statement");
                return Ok(Some(PlanReport {
                    error: Some(error.to_string()),
                    ..PlanReport::default()
                }));
            }
        };
        let opcode_count = match program_length(&connection, sql) {
            Ok(count) => count,
            Err(error) => {
                return Ok(Some(PlanReport {
                    error: Some(error.to_string()),
                    details,
                    ..PlanReport::default()
                }));
            }
        };

        Ok(Some(PlanReport {
            total_cost: Some(opcode_count as f64),
            details,
            ..PlanReport::default()
        }))
    }

    fn execute(&self, sql: &str) -> Result<ExecutionPayload> {
        let connection = self.connect()?;
        let mut statement = match connection.prepare(sql) {
            Ok(statement) => statement,
            Err(error) => return Ok(embedded_error(&error)),
        };

        if statement.column_count() == 0 {
            return Ok(match statement.execute([]) {
                Ok(changed) => ExecutionPayload {
                    rows: Vec::new(),
                    row_count: Some(changed as u64),
                    error: None,
                },
                Err(error) => embedded_error(&error),
            });
        }

        Ok(match collect_rows(&mut statement, self.row_cap) {
            Ok((rows, row_count)) => {
                if row_count > rows.len() as u64 {
                    debug!(row_count, kept = rows.len(), "result rows truncated at row cap");
                }
                ExecutionPayload {
                    rows,
                    row_count: Some(row_count),
                    error: None,
                }
            }
            Err(error) => embedded_error(&error),
        })
    }
}

fn embedded_error(error: &rusqlite::Error) -> ExecutionPayload {
    ExecutionPayload {
        rows: Vec::new(),
        row_count: None,
        error: Some(error.to_string()),
    }
}

fn query_plan_details(connection: &Connection, sql: &str) -> rusqlite::Result<Vec<String>> {
    let mut statement = connection.prepare(&format!("EXPLAIN QUERY PLAN {sql}"))?;
    let details = statement
        .query_map([], |row| row.get::<usize, String>(3))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(details)
}

fn program_length(connection: &Connection, sql: &str) -> rusqlite::Result<usize> {
    let mut statement = connection.prepare(&format!("EXPLAIN {sql}"))?;
    let mut rows = statement.query([])?;
    let mut count = 0usize;
    while rows.next()?.is_some() {
        count += 1;
    }
    Ok(count)
}

/// Keeps at most `row_cap` rows but steps the whole cursor, so the returned
/// count covers every row the statement produced.
fn collect_rows(
    statement: &mut Statement<'_>,
    row_cap: usize,
) -> rusqlite::Result<(Vec<Value>, u64)> {
    let column_names = statement
        .column_names()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();

    let mut rows = statement.query([])?;
    let mut result_rows = Vec::new();
    let mut row_count = 0u64;
    while let Some(row) = rows.next()? {
        row_count += 1;
        if result_rows.len() >= row_cap {
            continue;
        }

        let mut record = serde_json::Map::new();
        for (index, column_name) in column_names.iter().enumerate() {
            let value = row.get::<usize, SqlValue>(index)?;
            record.insert(column_name.clone(), json_value_from_sql(value));
        }
        result_rows.push(Value::Object(record));
    }

    Ok((result_rows, row_count))
}

fn json_value_from_sql(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(value) => json!(value),
        SqlValue::Real(value) => json!(value),
        SqlValue::Text(value) => json!(value),
        SqlValue::Blob(value) => json!(encode_blob_hex(&value)),
    }
}

fn encode_blob_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push(HEX[(byte >> 4) as usize] as char);
        output.push(HEX[(byte & 0x0f) as usize] as char);
    }
    output
}

#[cfg(test)]
mod tests {
    use rusqlite::types::Value as SqlValue;
    use serde_json::json;

    use super::{encode_blob_hex, json_value_from_sql};

    #[test]
    fn blobs_render_as_lowercase_hex() {
        assert_eq!(encode_blob_hex(&[0x00, 0xab, 0x7f]), "00ab7f");
    }

    #[test]
    fn sql_values_map_onto_json_scalars() {
        assert_eq!(json_value_from_sql(SqlValue::Null), json!(null));
        assert_eq!(json_value_from_sql(SqlValue::Integer(7)), json!(7));
        assert_eq!(json_value_from_sql(SqlValue::Text("x".into())), json!("x"));
    }
}
