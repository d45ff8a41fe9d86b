use queryscope::models::advisory::UNBOUND_QUERY_LOG_ID;
use queryscope::models::{Severity, SuggestionKind};
use queryscope::scanner::{RULE_ORDER, scan, scan_with, triggered_kinds};
use queryscope::utils::ids::SequentialIds;
use queryscope::utils::time::FixedClock;

const EVERYTHING_QUERY: &str = "SELECT * FROM orders o JOIN a ON 1 JOIN b ON 1 JOIN c ON 1 \
     JOIN d ON 1 WHERE o.name LIKE '%x' AND o.id <> 3 AND o.kind IN \
     (SELECT DISTINCT kind FROM k) ORDER BY o.id OFFSET 10";

fn kinds(query: &str) -> Vec<SuggestionKind> {
    scan(query)
        .into_iter()
        .map(|suggestion| suggestion.suggestion_type)
        .collect()
}

#[test]
fn empty_and_clean_queries_produce_no_suggestions() {
    assert!(scan("").is_empty());
    assert!(scan("   \n\t").is_empty());
    assert!(scan("select id from t where id=1 limit 10").is_empty());
}

#[test]
fn bare_select_star_reports_star_missing_where_and_missing_limit_in_order() {
    assert_eq!(
        kinds("select * from t"),
        vec![
            SuggestionKind::SelectStar,
            SuggestionKind::MissingWhere,
            SuggestionKind::MissingLimit,
        ]
    );
}

#[test]
fn matching_ignores_case_and_surrounding_whitespace() {
    assert_eq!(kinds("   SELECT * FROM T   "), kinds("select * from t"));
}

#[test]
fn select_star_fires_exactly_once_even_when_repeated() {
    let suggestions = scan("select * from a where id in (select * from b) limit 1");
    let star_count = suggestions
        .iter()
        .filter(|suggestion| suggestion.suggestion_type == SuggestionKind::SelectStar)
        .count();
    assert_eq!(star_count, 1);
}

#[test]
fn update_and_delete_without_where_are_high_severity() {
    for query in ["UPDATE users SET active = 0", "DELETE FROM sessions"] {
        let suggestions = scan(query);
        assert_eq!(suggestions.len(), 1, "unexpected suggestions for {query}");
        assert_eq!(suggestions[0].suggestion_type, SuggestionKind::MissingWhere);
        assert_eq!(suggestions[0].severity, Severity::High);
    }
}

#[test]
fn inserts_are_not_flagged_for_missing_where() {
    assert!(scan("insert into items (name) values ('x')").is_empty());
}

#[test]
fn multi_trigger_output_follows_catalogue_order() {
    let observed = kinds(EVERYTHING_QUERY);
    let expected = RULE_ORDER
        .iter()
        .copied()
        .filter(|kind| *kind != SuggestionKind::MissingWhere)
        .collect::<Vec<_>>();
    assert_eq!(observed, expected);
}

#[test]
fn multi_trigger_catalogue_snapshot() {
    let summary = scan(EVERYTHING_QUERY)
        .into_iter()
        .map(|suggestion| {
            format!(
                "{}:{}",
                suggestion.suggestion_type.as_str(),
                suggestion.severity.as_str()
            )
        })
        .collect::<Vec<_>>();

    insta::assert_json_snapshot!(summary, @r###"
    [
      "SELECT_STAR:medium",
      "OR_CONDITION:medium",
      "LEADING_WILDCARD:high",
      "MISSING_LIMIT:medium",
      "MULTIPLE_JOINS:high",
      "ORDER_WITHOUT_LIMIT:high",
      "DISTINCT_USAGE:low",
      "NOT_EQUAL_OPERATOR:low",
      "OFFSET_PAGINATION:medium",
      "SUBQUERY_IN_WHERE:high"
    ]
    "###);
}

#[test]
fn multiple_joins_description_embeds_join_count() {
    let suggestion = scan(EVERYTHING_QUERY)
        .into_iter()
        .find(|suggestion| suggestion.suggestion_type == SuggestionKind::MultipleJoins)
        .expect("four joins should trigger MULTIPLE_JOINS");
    assert!(
        suggestion.description.starts_with("4 JOINs detected"),
        "unexpected description: {}",
        suggestion.description
    );
}

#[test]
fn descriptions_carry_concrete_remediation_guidance() {
    let descriptions = scan(EVERYTHING_QUERY)
        .into_iter()
        .map(|suggestion| (suggestion.suggestion_type, suggestion.description))
        .collect::<Vec<_>>();
    let description_of = |kind: SuggestionKind| {
        descriptions
            .iter()
            .find(|(found, _)| *found == kind)
            .map(|(_, description)| description.as_str())
            .expect("kind should be reported")
    };

    assert!(
        description_of(SuggestionKind::OrCondition).ends_with("improve query speed by 10-100x.")
    );
    assert!(
        description_of(SuggestionKind::OffsetPagination).contains("still scans 1000*limit rows")
    );
    assert!(
        description_of(SuggestionKind::SelectStar)
            .contains("list columns to: 1) Reduce network transfer, 2) Enable")
    );
    assert!(
        descriptions
            .iter()
            .all(|(_, description)| !description.contains("  "))
    );
}

#[test]
fn order_by_keyword_also_trips_or_condition() {
    let observed = triggered_kinds("select id from t where id = 1 order by id limit 5");
    assert_eq!(observed, vec![SuggestionKind::OrCondition]);
}

#[test]
fn scanning_twice_is_deterministic_apart_from_ids() {
    let first = scan(EVERYTHING_QUERY);
    let second = scan(EVERYTHING_QUERY);

    assert_eq!(first.len(), second.len());
    for (left, right) in first.iter().zip(&second) {
        assert_eq!(left.suggestion_type, right.suggestion_type);
        assert_eq!(left.description, right.description);
        assert_eq!(left.severity, right.severity);
        assert_ne!(left.id, right.id);
    }
}

#[test]
fn injected_ids_and_clock_make_output_fully_reproducible() {
    let clock = FixedClock::at_unix_ms(1_772_000_000_000);
    let first = scan_with(&SequentialIds::new("sg"), &clock, "select * from t");
    let second = scan_with(&SequentialIds::new("sg"), &clock, "select * from t");

    assert_eq!(first, second);
    let ids = first.iter().map(|s| s.id.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["sg-1", "sg-2", "sg-3"]);
    assert!(
        first
            .iter()
            .all(|s| s.query_log_id == UNBOUND_QUERY_LOG_ID
                && s.created_at == "2026-02-25T06:13:20.000Z")
    );
}

#[test]
fn suggestion_kinds_serialize_in_wire_form() {
    let suggestion = scan("select * from t where id = 1 limit 5")
        .pop()
        .expect("select star should be reported");
    let encoded = serde_json::to_value(&suggestion).expect("suggestion should serialize");

    assert_eq!(encoded["suggestion_type"], "SELECT_STAR");
    assert_eq!(encoded["severity"], "medium");
    assert_eq!(
        SuggestionKind::from_key("SUBQUERY_IN_WHERE"),
        Some(SuggestionKind::SubqueryInWhere)
    );
    assert_eq!(SuggestionKind::from_key("select_star"), None);
}
