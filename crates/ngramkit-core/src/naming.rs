//! Identifier validation and property-to-column naming.

use crate::error::{Result, SearchError};
use regex::Regex;
use std::sync::LazyLock;

/// Plain SQL identifier: letter or underscore, then letters, digits, underscores.
static SQL_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Time zone names ('Europe/Paris') and offsets ('+05:30').
static TIME_ZONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_+\-:/]+$").unwrap());

/// ISO 8601 UTC offset, positive east of Greenwich ('+05:30', '-03:00').
static UTC_OFFSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-](?:[01][0-9]|2[0-3]):[0-5][0-9]$").unwrap());

static CAMEL_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").unwrap());

pub fn is_sql_identifier(name: &str) -> bool {
    SQL_IDENTIFIER.is_match(name)
}

/// Validate an identifier that is about to be embedded into SQL.
pub fn require_sql_identifier(field: &str, name: &str) -> Result<()> {
    if is_sql_identifier(name) {
        Ok(())
    } else {
        Err(SearchError::invalid(field, format!("Invalid {} name", field)))
    }
}

/// Validate a time zone name or offset that is about to be embedded into SQL.
pub fn require_time_zone(zone: &str) -> Result<()> {
    if TIME_ZONE.is_match(zone) {
        Ok(())
    } else {
        Err(SearchError::invalid("time_zone", "Invalid time zone"))
    }
}

pub fn is_utc_offset(zone: &str) -> bool {
    UTC_OFFSET.is_match(zone)
}

/// Convert a camelCase property name to its snake_case column name.
///
/// `createdDate` → `created_date`, `fullTextSearchData` → `full_text_search_data`.
pub fn to_snake_case(property: &str) -> String {
    CAMEL_BOUNDARY
        .replace_all(property, "${1}_${2}")
        .to_lowercase()
}

/// Column name for a property, validated as an identifier.
pub fn column_for_property(property: &str) -> Result<String> {
    require_sql_identifier("property", property)?;
    Ok(to_snake_case(property))
}
