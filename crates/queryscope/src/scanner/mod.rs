//! Static anti-pattern scan over raw SQL text.
//!
//! Every rule is a substring or regex test against a lower-cased, trimmed
//! copy of the query. Rules never short-circuit each other; output order is
//! [`RULE_ORDER`].

use std::sync::OnceLock;

use regex::Regex;

use crate::models::advisory::UNBOUND_QUERY_LOG_ID;
use crate::models::{Severity, Suggestion, SuggestionKind};
use crate::utils::ids::{IdGenerator, UuidGenerator};
use crate::utils::time::{Clock, SystemClock};

pub const MULTIPLE_JOINS_THRESHOLD: usize = 3;

pub const RULE_ORDER: [SuggestionKind; 11] = [
    SuggestionKind::SelectStar,
    SuggestionKind::MissingWhere,
    SuggestionKind::OrCondition,
    SuggestionKind::LeadingWildcard,
    SuggestionKind::MissingLimit,
    SuggestionKind::MultipleJoins,
    SuggestionKind::OrderWithoutLimit,
    SuggestionKind::DistinctUsage,
    SuggestionKind::NotEqualOperator,
    SuggestionKind::OffsetPagination,
    SuggestionKind::SubqueryInWhere,
];

/// Normalized query text plus the counts rule templates interpolate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanInput {
    normalized: String,
    join_count: usize,
}

impl ScanInput {
    #[must_use]
    pub fn new(query_text: &str) -> Self {
        let normalized = query_text.trim().to_lowercase();
        let join_count = normalized.matches("join").count();
        Self {
            normalized,
            join_count,
        }
    }

    #[must_use]
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    #[must_use]
    pub fn join_count(&self) -> usize {
        self.join_count
    }

    fn has(&self, needle: &str) -> bool {
        self.normalized.contains(needle)
    }
}

impl SuggestionKind {
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::SelectStar | Self::OrCondition | Self::MissingLimit | Self::OffsetPagination => {
                Severity::Medium
            }
            Self::MissingWhere
            | Self::LeadingWildcard
            | Self::MultipleJoins
            | Self::OrderWithoutLimit
            | Self::SubqueryInWhere => Severity::High,
            Self::DistinctUsage | Self::NotEqualOperator => Severity::Low,
        }
    }

    #[must_use]
    pub fn matches(self, input: &ScanInput) -> bool {
        match self {
            Self::SelectStar => input.has("select *"),
            Self::MissingWhere => {
                !input.has("where")
                    && (input.has("select") || input.has("update") || input.has("delete"))
            }
            // Raw substring: also fires on ORDER, FOR, ERROR and friends.
            Self::OrCondition => input.has("or"),
            Self::LeadingWildcard => {
                input.has("like") && leading_wildcard_regex().is_match(input.normalized())
            }
            Self::MissingLimit => !input.has("limit") && input.has("select"),
            Self::MultipleJoins => input.join_count() > MULTIPLE_JOINS_THRESHOLD,
            Self::OrderWithoutLimit => input.has("order by") && !input.has("limit"),
            Self::DistinctUsage => input.has("distinct"),
            Self::NotEqualOperator => input.has("!=") || input.has("<>"),
            Self::OffsetPagination => input.has("offset"),
            Self::SubqueryInWhere => subquery_in_where_regex().is_match(input.normalized()),
        }
    }

    #[must_use]
    pub fn description(self, input: &ScanInput) -> String {
        let text = match self {
            Self::SelectStar => {
                "Avoid SELECT *. Explicitly list columns to: 1) Reduce network transfer, \
                 2) Enable better indexing, 3) Make queries maintainable, 4) Prevent \
                 breaking changes when schema evolves."
            }
            Self::MissingWhere => {
                "Missing WHERE clause causes full table scan! This reads EVERY row which \
                 can: 1) Lock tables for minutes on large datasets, 2) Consume excessive \
                 memory, 3) Impact other queries. Add WHERE conditions or use pagination."
            }
            Self::OrCondition => {
                "OR conditions often prevent index usage. Alternative: Use IN clause for \
                 same column (WHERE col IN (1,2,3)), or use UNION for different columns. \
                 This can improve query speed by 10-100x."
            }
            Self::LeadingWildcard => {
                "Leading wildcard LIKE '%text%' forces full table scan! Alternatives: \
                 1) Use full-text search (PostgreSQL: to_tsvector), 2) Use trigram indexes \
                 (pg_trgm), 3) Consider ElasticSearch for complex searches."
            }
            Self::MissingLimit => {
                "Add LIMIT to prevent accidentally loading millions of rows. Best \
                 practices: Use LIMIT 100-1000 for UI, implement cursor-based pagination \
                 for large datasets, consider OFFSET alternatives."
            }
            Self::MultipleJoins => {
                return format!(
                    "{} JOINs detected! Solutions: 1) Create materialized views for \
                     read-heavy queries, 2) Denormalize frequently accessed data, 3) Add \
                     covering indexes, 4) Split into multiple queries with \
                     application-level joins.",
                    input.join_count()
                );
            }
            Self::OrderWithoutLimit => {
                "ORDER BY without LIMIT sorts ALL rows in memory! Solutions: 1) Add LIMIT \
                 if you only need top N results, 2) Create index on ORDER BY columns, \
                 3) Use OFFSET-LIMIT for pagination (or better: cursor-based)."
            }
            Self::DistinctUsage => {
                "DISTINCT can be expensive on large datasets. Alternatives: 1) Use GROUP BY \
                 if aggregating, 2) Fix data model to prevent duplicates, 3) Add unique \
                 constraints, 4) Use window functions for complex cases."
            }
            Self::NotEqualOperator => {
                "NOT EQUAL (!=, <>) often prevents index usage. Better: Use positive \
                 conditions (= IN) combined with NOT EXISTS subquery for complex \
                 exclusions, or add partial indexes for specific values."
            }
            Self::OffsetPagination => {
                "OFFSET pagination becomes slower on deep pages! For page 1000, database \
                 still scans 1000*limit rows. Solution: Use cursor-based pagination with \
                 WHERE id > last_id LIMIT N for consistent performance."
            }
            Self::SubqueryInWhere => {
                "Subquery in WHERE can execute for each row! Optimizations: 1) Convert to \
                 JOIN when possible, 2) Use EXISTS instead of IN for large subqueries, \
                 3) Create temporary table for complex subqueries, 4) Add indexes on \
                 subquery columns."
            }
        };
        text.to_string()
    }
}

/// Kinds triggered by `query_text`, in evaluation order.
#[must_use]
pub fn triggered_kinds(query_text: &str) -> Vec<SuggestionKind> {
    let input = ScanInput::new(query_text);
    RULE_ORDER
        .iter()
        .copied()
        .filter(|kind| kind.matches(&input))
        .collect()
}

#[must_use]
pub fn scan(query_text: &str) -> Vec<Suggestion> {
    scan_with(&UuidGenerator, &SystemClock, query_text)
}

/// Suggestions for `query_text`; each carries a placeholder owner id that the
/// caller rebinds once the query log is persisted.
#[must_use]
pub fn scan_with(ids: &dyn IdGenerator, clock: &dyn Clock, query_text: &str) -> Vec<Suggestion> {
    let input = ScanInput::new(query_text);
    if input.normalized().is_empty() {
        return Vec::new();
    }

    let created_at = clock.now_utc();
    RULE_ORDER
        .iter()
        .copied()
        .filter(|kind| kind.matches(&input))
        .map(|kind| Suggestion {
            id: ids.next_id(),
            query_log_id: UNBOUND_QUERY_LOG_ID.to_string(),
            suggestion_type: kind,
            description: kind.description(&input),
            severity: kind.severity(),
            created_at: created_at.clone(),
        })
        .collect()
}

pub fn rebind_suggestions(suggestions: &mut [Suggestion], query_log_id: &str) {
    for suggestion in suggestions {
        suggestion.query_log_id = query_log_id.to_string();
    }
}

fn leading_wildcard_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#"like\s+['"]%"#).expect("leading wildcard regex should compile")
    })
}

fn subquery_in_where_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"where.*\([^)]*select").expect("subquery in where regex should compile")
    })
}
