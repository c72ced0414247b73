//! Store-specific SQL templates.
//!
//! Each dialect maps the logical operations the search layer needs to SQL text with
//! indexed slots (see [`crate::template`]). The store has to provide three functions
//! with a uniform shape, so that both dialects can share the same call sites:
//!
//! ```text
//! FULL_TEXT_SEARCH(search_column, query)       -> 0 / 1
//! FULL_TEXT_SEARCH_RANK(search_column, query)  -> sortable number
//! JSON_CONTAINS(json_column, json_value)       -> 0 / 1
//! ```
//!
//! Templates do no escaping. Every argument must be validated or escaped by the caller.

use crate::error::SearchError;
use crate::naming;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[default]
    Postgres,
    Sqlite,
}

/// Granularity of timestamp-to-date conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateBucket {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl SqlDialect {
    pub const ALL: [SqlDialect; 2] = [SqlDialect::Postgres, SqlDialect::Sqlite];

    pub fn as_str(&self) -> &'static str {
        match self {
            SqlDialect::Postgres => "postgres",
            SqlDialect::Sqlite => "sqlite",
        }
    }

    /// Slots: JSON column, JSON-encoded value.
    pub fn json_contains_template(&self) -> &'static str {
        match self {
            SqlDialect::Postgres => "CAST(JSON_CONTAINS({0}, '{1}') AS int) = 1",
            SqlDialect::Sqlite => "JSON_CONTAINS({0}, '{1}') = 1",
        }
    }

    /// Slots: search column, lenient query.
    pub fn full_text_search_template(&self) -> &'static str {
        match self {
            SqlDialect::Postgres => "CAST(FULL_TEXT_SEARCH({0}, '{1}') AS int) = 1",
            SqlDialect::Sqlite => "FULL_TEXT_SEARCH({0}, '{1}') = 1",
        }
    }

    /// Slots: search column, lenient query. Yields a number suitable for ORDER BY.
    pub fn full_text_search_rank_template(&self) -> &'static str {
        match self {
            SqlDialect::Postgres => "CAST(FULL_TEXT_SEARCH_RANK({0}, '{1}') AS double precision)",
            SqlDialect::Sqlite => "FULL_TEXT_SEARCH_RANK({0}, '{1}')",
        }
    }

    /// Separator producing a query that matches when any one term matches.
    ///
    /// Without it PostgreSQL treats terms as a conjunction, so a record missing a single
    /// n-gram of the phrase would not match at all.
    pub fn lenient_separator(&self) -> &'static str {
        match self {
            SqlDialect::Postgres | SqlDialect::Sqlite => " OR ",
        }
    }

    /// Join words or n-grams into a lenient (any-term) query.
    pub fn lenient_condition<I, S>(&self, words: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let separator = self.lenient_separator();
        let mut query = String::new();
        for word in words {
            if !query.is_empty() {
                query.push_str(separator);
            }
            query.push_str(word.as_ref());
        }
        query
    }

    /// Maximum size of the search column in bytes.
    ///
    /// PostgreSQL caps a `tsvector` at 1 MiB; the same bound is kept for SQLite so blobs
    /// stay portable between the two.
    pub fn max_search_data_length(&self) -> usize {
        match self {
            SqlDialect::Postgres | SqlDialect::Sqlite => 1024 * 1024 - 1,
        }
    }

    /// Slots: sequence name.
    pub fn next_sequence_value_template(&self) -> &'static str {
        match self {
            SqlDialect::Postgres => "SELECT nextval('{0}')",
            SqlDialect::Sqlite => {
                "SELECT COALESCE(MAX(seq), 0) + 1 FROM sqlite_sequence WHERE name = '{0}'"
            }
        }
    }

    /// Render a time zone as the zone slot of the date templates.
    ///
    /// Offsets are ISO 8601 in both dialects: '+02:00' is two hours east of UTC.
    /// PostgreSQL reads a bare offset in `AT TIME ZONE` with the POSIX sign (positive
    /// west), so its sign is flipped; zone names pass through unchanged. SQLite applies
    /// the slot as a date modifier, where only offsets are independent of the host's
    /// local time: `UTC` becomes '+00:00' and zone names are rejected.
    pub fn time_zone_argument(&self, zone: &str) -> Result<String, SearchError> {
        naming::require_time_zone(zone)?;
        let offset = naming::is_utc_offset(zone);
        match self {
            SqlDialect::Postgres if offset => Ok(invert_offset_sign(zone)),
            SqlDialect::Postgres => Ok(zone.to_string()),
            SqlDialect::Sqlite if offset => Ok(zone.to_string()),
            SqlDialect::Sqlite if zone.eq_ignore_ascii_case("UTC") || zone == "Z" => {
                Ok("+00:00".to_string())
            }
            SqlDialect::Sqlite => Err(SearchError::invalid(
                "time_zone",
                format!("SQLite accepts only UTC or a +HH:MM offset, got '{}'", zone),
            )),
        }
    }

    /// Slots: timestamp column, time zone (see [`SqlDialect::time_zone_argument`]).
    ///
    /// The resulting date depends on the zone: '2026-01-01 00:00:00' UTC is still
    /// 2025-12-31 at UTC-1.
    pub fn timestamp_to_date_template(&self, bucket: DateBucket) -> &'static str {
        match (self, bucket) {
            (SqlDialect::Postgres, DateBucket::Day) => "DATE({0} AT TIME ZONE '{1}')",
            (SqlDialect::Postgres, DateBucket::Week) => {
                "DATE(DATE_TRUNC('week', {0} AT TIME ZONE '{1}'))"
            }
            (SqlDialect::Postgres, DateBucket::Month) => {
                "DATE(DATE_TRUNC('month', {0} AT TIME ZONE '{1}'))"
            }
            (SqlDialect::Postgres, DateBucket::Quarter) => {
                "DATE(DATE_TRUNC('quarter', {0} AT TIME ZONE '{1}'))"
            }
            (SqlDialect::Postgres, DateBucket::Year) => {
                "DATE(DATE_TRUNC('year', {0} AT TIME ZONE '{1}'))"
            }

            (SqlDialect::Sqlite, DateBucket::Day) => "DATE({0}, '{1}')",
            // ISO weeks start on Monday, like DATE_TRUNC('week')
            (SqlDialect::Sqlite, DateBucket::Week) => "DATE({0}, '{1}', '-6 days', 'weekday 1')",
            (SqlDialect::Sqlite, DateBucket::Month) => "DATE({0}, '{1}', 'start of month')",
            (SqlDialect::Sqlite, DateBucket::Quarter) => {
                "DATE({0}, '{1}', 'start of month', \
                 '-' || ((CAST(STRFTIME('%m', {0}, '{1}') AS INTEGER) - 1) % 3) || ' months')"
            }
            (SqlDialect::Sqlite, DateBucket::Year) => "DATE({0}, '{1}', 'start of year')",
        }
    }

    /// Slots: timestamp column, time zone. Leaves two `?` placeholders for the date bounds.
    pub fn timestamp_as_date_range_template(&self) -> &'static str {
        match self {
            SqlDialect::Postgres => "DATE({0} AT TIME ZONE '{1}') BETWEEN ? AND ?",
            SqlDialect::Sqlite => "DATE({0}, '{1}') BETWEEN ? AND ?",
        }
    }
}

fn invert_offset_sign(offset: &str) -> String {
    match offset.strip_prefix('+') {
        Some(rest) => format!("-{}", rest),
        None => format!("+{}", offset.trim_start_matches('-')),
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SqlDialect {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(SqlDialect::Postgres),
            "sqlite" | "sqlite3" => Ok(SqlDialect::Sqlite),
            other => Err(SearchError::UnknownDialect(other.to_string())),
        }
    }
}

impl FromStr for DateBucket {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(DateBucket::Day),
            "week" => Ok(DateBucket::Week),
            "month" => Ok(DateBucket::Month),
            "quarter" => Ok(DateBucket::Quarter),
            "year" => Ok(DateBucket::Year),
            other => Err(SearchError::invalid("bucket", format!("unknown date bucket '{}'", other))),
        }
    }
}
