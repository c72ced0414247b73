//! Search phrase and value fragments for WHERE clauses.
//!
//! Fragments are plain SQL text: the query layer embeds them as-is, so every value is
//! validated or escaped here before it reaches a template. Positional placeholders are
//! never passed as template arguments.

use crate::config::SearchColumns;
use crate::dialect::{DateBucket, SqlDialect};
use crate::error::{Result, SearchError};
use crate::naming;
use crate::ngram::{generate, NgramConfig};
use crate::template::render;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Substrings that must never reach a search template.
pub const INJECTION_MARKERS: [&str; 4] = ["'", "\"", "--", ";"];

/// A full-text match built from a search phrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullTextCondition {
    /// N-grams of the phrase, in generation order.
    pub ngrams: Vec<String>,
    /// N-grams joined with the dialect's lenient separator.
    pub query: String,
    /// Rendered boolean expression.
    pub predicate: String,
}

/// Builds WHERE fragments for one dialect.
#[derive(Debug, Clone)]
pub struct SearchPredicateBuilder {
    dialect: SqlDialect,
    search_column: String,
}

impl SearchPredicateBuilder {
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            search_column: SearchColumns::SEARCH_DATA.to_string(),
        }
    }

    /// Use a qualified or renamed search column (`t.full_text_search_data`).
    pub fn with_search_column(mut self, column: impl Into<String>) -> Result<Self> {
        let column = column.into();
        for part in column.split('.') {
            naming::require_sql_identifier("column", part)?;
        }
        self.search_column = column;
        Ok(self)
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    pub fn search_column(&self) -> &str {
        &self.search_column
    }

    /// Turn a search phrase into a lenient full-text predicate.
    ///
    /// Returns `None` for a missing or blank phrase. A phrase that yields no n-grams
    /// (shorter than the minimum length) still produces a condition, with an empty query
    /// that matches nothing.
    pub fn build_condition(
        &self,
        phrase: Option<&str>,
        config: &NgramConfig,
    ) -> Result<Option<FullTextCondition>> {
        let phrase = match phrase {
            Some(p) if !p.trim().is_empty() => p,
            _ => return Ok(None),
        };

        let ngrams = generate(phrase, config).into_vec();
        if let Some(bad) = ngrams.iter().find(|n| contains_injection_marker(n)) {
            debug!("Rejected search n-gram '{}'", bad);
            return Err(SearchError::invalid(
                "phrase",
                "Invalid characters (SQL injection?) in search text",
            ));
        }

        let query = self.dialect.lenient_condition(&ngrams);
        let predicate = render(
            self.dialect.full_text_search_template(),
            &[&self.search_column, &query],
        )?;

        Ok(Some(FullTextCondition {
            ngrams,
            query,
            predicate,
        }))
    }

    /// Rank expression of a condition, suitable for ORDER BY.
    pub fn rank_expression(&self, condition: &FullTextCondition) -> Result<String> {
        render(
            self.dialect.full_text_search_rank_template(),
            &[&self.search_column, &condition.query],
        )
    }

    /// Match rows whose JSON column `property` contains `value`.
    ///
    /// `property` is a camelCase property or column name; it is mapped to its snake_case
    /// column. The JSON text is embedded in a single-quoted literal, so single quotes are
    /// doubled.
    pub fn build_json_contains_condition<T: Serialize + ?Sized>(
        &self,
        property: &str,
        value: &T,
    ) -> Result<String> {
        let column = naming::column_for_property(property)?;
        let json = serde_json::to_string(value)
            .map_err(|e| SearchError::invalid("value", format!("not JSON-serializable: {}", e)))?;
        let literal = json.replace('\'', "''");

        render(self.dialect.json_contains_template(), &[&column, &literal])
    }

    /// Convert a timestamp column to the start date of its bucket in `time_zone`.
    pub fn build_date_bucket(
        &self,
        column: &str,
        bucket: DateBucket,
        time_zone: &str,
    ) -> Result<String> {
        naming::require_sql_identifier("column", column)?;
        let zone = self.dialect.time_zone_argument(time_zone)?;
        render(
            self.dialect.timestamp_to_date_template(bucket),
            &[column, &zone],
        )
    }

    /// Date-range predicate over a timestamp column, leaving `? AND ?` for the bounds.
    pub fn build_date_range(&self, column: &str, time_zone: &str) -> Result<String> {
        naming::require_sql_identifier("column", column)?;
        let zone = self.dialect.time_zone_argument(time_zone)?;
        render(
            self.dialect.timestamp_as_date_range_template(),
            &[column, &zone],
        )
    }

    /// Statement fetching the next value of a sequence.
    pub fn build_next_sequence_value(&self, sequence: &str) -> Result<String> {
        naming::require_sql_identifier("sequence", sequence)?;
        render(self.dialect.next_sequence_value_template(), &[sequence])
    }
}

fn contains_injection_marker(text: &str) -> bool {
    INJECTION_MARKERS.iter().any(|m| text.contains(m))
}
