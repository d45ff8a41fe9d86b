use std::path::PathBuf;

use queryscope::advisor::{Advisor, BackendUnavailable, DiscardStore, ExecutionBackend};
use queryscope::backend::{DEFAULT_ROW_CAP, SqliteBackend};
use queryscope::models::{QueryStatus, SuggestionKind};
use queryscope::sqlite::SqliteStore;
use rusqlite::Connection;
use serde_json::json;

#[test]
fn explain_reports_program_length_and_plan_details() {
    let target = seeded_target("explain");
    let backend = SqliteBackend::new(&target);

    let plan = backend
        .explain("SELECT id, name FROM items WHERE id = 2")
        .expect("explain should succeed")
        .expect("sqlite should always produce a plan");

    assert!(plan.error.is_none());
    assert!(plan.total_cost.is_some_and(|cost| cost > 0.0));
    assert!(!plan.details.is_empty());
    assert!(plan.execution_time_ms.is_none());

    let _ = std::fs::remove_file(target);
}

#[test]
fn execute_returns_rows_as_json_objects() {
    let target = seeded_target("rows");
    let backend = SqliteBackend::new(&target);

    let payload = backend
        .execute("SELECT id, name, payload FROM items ORDER BY id LIMIT 2")
        .expect("execute should succeed");

    assert!(payload.error.is_none());
    assert_eq!(payload.row_count, Some(2));
    assert_eq!(
        payload.rows,
        vec![
            json!({"id": 1, "name": "alpha", "payload": "00ff"}),
            json!({"id": 2, "name": "beta", "payload": null}),
        ]
    );

    let _ = std::fs::remove_file(target);
}

#[test]
fn row_cap_limits_returned_rows_but_not_the_row_count() {
    let target = seeded_target("cap");
    let backend = SqliteBackend::new(&target).row_cap(2);

    let payload = backend
        .execute("SELECT id FROM items")
        .expect("execute should succeed");
    assert_eq!(payload.rows.len(), 2);
    assert_eq!(payload.row_count, Some(3));

    let _ = std::fs::remove_file(target);
}

#[test]
fn large_results_report_full_row_count_at_default_cap() {
    let target = temp_db_path("large");
    let connection = Connection::open(&target).expect("target database should open");
    connection
        .execute_batch(
            "CREATE TABLE numbers (n INTEGER NOT NULL);
             WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < 5000)
             INSERT INTO numbers (n) SELECT n FROM seq;",
        )
        .expect("target database should seed");
    drop(connection);

    let backend = SqliteBackend::new(&target);
    let payload = backend
        .execute("SELECT n FROM numbers")
        .expect("execute should succeed");
    assert_eq!(payload.rows.len(), DEFAULT_ROW_CAP);
    assert_eq!(payload.row_count, Some(5_000));

    let result = Advisor::new(&backend, &DiscardStore).run("SELECT n FROM numbers");
    assert_eq!(result.log.row_count, 5_000);

    let _ = std::fs::remove_file(target);
}

#[test]
fn write_statements_report_changed_rows() {
    let target = seeded_target("write");
    let backend = SqliteBackend::new(&target);

    let payload = backend
        .execute("UPDATE items SET name = 'renamed' WHERE id > 1")
        .expect("execute should succeed");
    assert!(payload.error.is_none());
    assert!(payload.rows.is_empty());
    assert_eq!(payload.row_count, Some(2));

    let _ = std::fs::remove_file(target);
}

#[test]
fn read_only_backend_embeds_write_refusal() {
    let target = seeded_target("readonly");
    let backend = SqliteBackend::new(&target).read_only(true);

    let payload = backend
        .execute("DELETE FROM items")
        .expect("statement errors are embedded, not raised");
    let message = payload.error.expect("write should be refused");
    assert!(message.contains("readonly"), "unexpected error: {message}");

    let _ = std::fs::remove_file(target);
}

#[test]
fn syntax_errors_are_embedded_in_the_plan() {
    let target = seeded_target("syntax");
    let backend = SqliteBackend::new(&target);

    let plan = backend
        .explain("SELEC nothing")
        .expect("statement errors are embedded, not raised")
        .expect("plan report should be returned");
    assert!(plan.error.is_some());

    let _ = std::fs::remove_file(target);
}

#[test]
fn missing_target_is_reported_as_unavailable() {
    let backend = SqliteBackend::new(temp_db_path("missing"));

    let err = backend
        .execute("SELECT 1")
        .expect_err("missing database must fail");
    assert!(err.downcast_ref::<BackendUnavailable>().is_some());

    let result = Advisor::new(&backend, &DiscardStore).run("SELECT 1");
    assert_eq!(result.log.status, QueryStatus::Error);
    assert!(
        result
            .log
            .error_message
            .as_deref()
            .is_some_and(|message| message.starts_with("execution backend unavailable")),
        "unexpected log: {:?}",
        result.log
    );
}

#[test]
fn advisory_run_against_sqlite_records_history() {
    let target = seeded_target("e2e");
    let store_path = temp_db_path("e2e-store");
    let backend = SqliteBackend::new(&target);
    let store = SqliteStore::open(&store_path).expect("store should open");

    let good = Advisor::new(&backend, &store).run("SELECT * FROM items");
    assert_eq!(good.log.status, QueryStatus::Success);
    assert_eq!(good.log.row_count, 3);
    assert_eq!(
        good.suggestions
            .iter()
            .map(|s| s.suggestion_type)
            .collect::<Vec<_>>(),
        vec![
            SuggestionKind::SelectStar,
            SuggestionKind::MissingWhere,
            SuggestionKind::MissingLimit,
        ]
    );

    let bad = Advisor::new(&backend, &store).run("SELECT * FROM no_such_table");
    assert_eq!(bad.log.status, QueryStatus::Error);
    assert!(
        bad.log
            .error_message
            .as_deref()
            .is_some_and(|message| message.contains("no_such_table")),
        "unexpected log: {:?}",
        bad.log
    );
    assert!(bad.suggestions.is_empty());

    let history = store.recent_logs(10).expect("history should load");
    assert_eq!(history.len(), 2);
    let summary = store.performance_summary().expect("summary should compute");
    assert_eq!(summary.total_queries, 2);
    assert_eq!(summary.successful_queries, 1);
    assert_eq!(
        store
            .suggestions_for_log(&good.log.id)
            .expect("suggestions should load")
            .len(),
        3
    );

    let _ = std::fs::remove_file(target);
    let _ = std::fs::remove_file(store_path);
}

fn seeded_target(label: &str) -> PathBuf {
    let path = temp_db_path(label);
    let connection = Connection::open(&path).expect("target database should open");
    connection
        .execute_batch(
            "CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT NOT NULL, payload BLOB);
             INSERT INTO items (id, name, payload) VALUES (1, 'alpha', x'00ff');
             INSERT INTO items (id, name, payload) VALUES (2, 'beta', NULL);
             INSERT INTO items (id, name, payload) VALUES (3, 'gamma', NULL);",
        )
        .expect("target database should seed");
    path
}

fn temp_db_path(label: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock should be after epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("queryscope-{label}-{nanos}.sqlite"))
}
