//! The contract a persisted record satisfies to take part in full-text search.

use crate::dialect::SqlDialect;
use crate::ngram::NgramConfig;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// A named, lazily evaluated text source of a record.
///
/// Sources are read in declaration order when the raw search text is assembled;
/// `None` and blank values are skipped.
pub struct TextSource<'a> {
    name: &'a str,
    accessor: Box<dyn Fn() -> Option<Cow<'a, str>> + 'a>,
}

impl<'a> TextSource<'a> {
    /// Source backed by an accessor, evaluated only when the text is assembled.
    pub fn lazy(name: &'a str, accessor: impl Fn() -> Option<Cow<'a, str>> + 'a) -> Self {
        Self {
            name,
            accessor: Box::new(accessor),
        }
    }

    /// Source backed by a borrowed field value.
    pub fn field(name: &'a str, value: Option<&'a str>) -> Self {
        Self::lazy(name, move || value.map(Cow::Borrowed))
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// Evaluate the accessor.
    pub fn read(&self) -> Option<Cow<'a, str>> {
        (self.accessor)()
    }
}

impl fmt::Debug for TextSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextSource").field("name", &self.name).finish()
    }
}

/// A record whose text is indexed as an n-gram blob plus a checksum.
pub trait SearchableRecord {
    /// Stable record type name (cache and registry key, log context).
    fn record_type(&self) -> &str;

    /// Record identity for log messages, if it has one yet.
    fn record_id(&self) -> Option<String> {
        None
    }

    /// N-gram configuration; identical for every record of one type.
    fn ngram_config(&self) -> NgramConfig;

    /// Ordered text sources.
    fn text_sources(&self) -> Vec<TextSource<'_>>;

    fn search_data(&self) -> Option<&str>;

    fn set_search_data(&mut self, value: String);

    fn search_data_checksum(&self) -> Option<&str>;

    fn set_search_data_checksum(&mut self, value: String);

    /// Maximum length of the indexed blob in bytes, normally
    /// [`SqlDialect::max_search_data_length`] of the active dialect.
    fn max_search_data_length(&self) -> usize;
}

/// Search configuration known from the type alone.
///
/// Lets the query side resolve a record type's n-gram configuration without
/// constructing a record.
pub trait StaticSearchConfig {
    const RECORD_TYPE: &'static str;
    const NGRAM_CONFIG: NgramConfig;
}

/// A generic searchable record with named string sources.
///
/// Useful when record types are only known at runtime (RPC callers, tests).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDocument {
    pub record_type: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub sources: Vec<NamedText>,
    #[serde(default)]
    pub search_data: Option<String>,
    #[serde(default)]
    pub search_data_checksum: Option<String>,
    #[serde(default)]
    pub ngram_config: NgramConfig,
    pub max_search_data_length: usize,
}

/// One named text value of a [`SearchDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedText {
    pub name: String,
    pub value: Option<String>,
}

impl SearchDocument {
    pub fn new(record_type: impl Into<String>, dialect: SqlDialect) -> Self {
        Self {
            record_type: record_type.into(),
            id: None,
            sources: Vec::new(),
            search_data: None,
            search_data_checksum: None,
            ngram_config: NgramConfig::DEFAULT,
            max_search_data_length: dialect.max_search_data_length(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_config(mut self, config: NgramConfig) -> Self {
        self.ngram_config = config;
        self
    }

    pub fn with_max_length(mut self, max_search_data_length: usize) -> Self {
        self.max_search_data_length = max_search_data_length;
        self
    }

    /// Append a source (order matters for the checksum).
    pub fn source(mut self, name: impl Into<String>, value: Option<&str>) -> Self {
        self.sources.push(NamedText {
            name: name.into(),
            value: value.map(String::from),
        });
        self
    }

    /// Replace the value of an existing source, or append it.
    pub fn set_source(&mut self, name: &str, value: Option<&str>) {
        match self.sources.iter_mut().find(|s| s.name == name) {
            Some(source) => source.value = value.map(String::from),
            None => self.sources.push(NamedText {
                name: name.to_string(),
                value: value.map(String::from),
            }),
        }
    }
}

impl SearchableRecord for SearchDocument {
    fn record_type(&self) -> &str {
        &self.record_type
    }

    fn record_id(&self) -> Option<String> {
        self.id.clone()
    }

    fn ngram_config(&self) -> NgramConfig {
        self.ngram_config
    }

    fn text_sources(&self) -> Vec<TextSource<'_>> {
        self.sources
            .iter()
            .map(|s| TextSource::field(&s.name, s.value.as_deref()))
            .collect()
    }

    fn search_data(&self) -> Option<&str> {
        self.search_data.as_deref()
    }

    fn set_search_data(&mut self, value: String) {
        self.search_data = Some(value);
    }

    fn search_data_checksum(&self) -> Option<&str> {
        self.search_data_checksum.as_deref()
    }

    fn set_search_data_checksum(&mut self, value: String) {
        self.search_data_checksum = Some(value);
    }

    fn max_search_data_length(&self) -> usize {
        self.max_search_data_length
    }
}
