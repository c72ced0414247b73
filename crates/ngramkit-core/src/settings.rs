//! Deployment settings: active dialect and runtime record types.
//!
//! Settings come from an optional JSON file; the `NGRAMKIT_DIALECT` environment variable
//! overrides the file's dialect. Without either, PostgreSQL is used.
//!
//! ```json
//! {
//!   "dialect": "sqlite",
//!   "recordTypes": {
//!     "article": { "mode": "all", "minLength": 3, "maxLength": 5 }
//!   }
//! }
//! ```

use crate::config::SettingsKeys;
use crate::config_cache::ConfigCache;
use crate::dialect::SqlDialect;
use crate::error::{Result, SearchError};
use crate::ngram::NgramConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSettings {
    #[serde(default)]
    pub dialect: SqlDialect,
    /// Record types registered at startup.
    #[serde(default)]
    pub record_types: BTreeMap<String, NgramConfig>,
}

impl SearchSettings {
    /// Load from `path` (or `NGRAMKIT_SETTINGS` when `path` is `None`), then apply the
    /// `NGRAMKIT_DIALECT` override.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var(SettingsKeys::SETTINGS_FILE_ENV).ok();
        let path = path.or(from_env.as_deref().map(Path::new));

        let settings = match path {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };

        let dialect = std::env::var(SettingsKeys::DIALECT_ENV).ok();
        settings.with_dialect_override(dialect.as_deref())
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| SearchError::io_with_path(e, path))?;
        let settings = Self::from_json_str(&content)?;
        info!(
            "Loaded search settings from {} (dialect: {}, {} record types)",
            path.display(),
            settings.dialect,
            settings.record_types.len()
        );
        Ok(settings)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| {
            SearchError::config(format!("invalid search settings: {}", e))
        })
    }

    /// Replace the dialect with a named one; blank or missing names keep the current one.
    pub fn with_dialect_override(mut self, dialect: Option<&str>) -> Result<Self> {
        if let Some(name) = dialect.filter(|d| !d.trim().is_empty()) {
            self.dialect = name.parse()?;
            debug!("Dialect overridden to {}", self.dialect);
        }
        Ok(self)
    }

    /// Register every configured record type.
    pub fn register_record_types(&self, cache: &ConfigCache) -> Result<()> {
        for (record_type, config) in &self.record_types {
            cache.register(record_type, *config)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ngram::NgramMode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_to_postgres() {
        let settings = SearchSettings::from_json_str("{}").unwrap();
        assert_eq!(settings.dialect, SqlDialect::Postgres);
        assert!(settings.record_types.is_empty());
    }

    #[test]
    fn test_parse_record_types() {
        let settings = SearchSettings::from_json_str(
            r#"{"dialect":"sqlite","recordTypes":{"article":{"mode":"words","minLength":2,"maxLength":6}}}"#,
        )
        .unwrap();
        assert_eq!(settings.dialect, SqlDialect::Sqlite);
        assert_eq!(
            settings.record_types["article"],
            NgramConfig::of(NgramMode::Words, 2, 6)
        );

        let cache = ConfigCache::new();
        settings.register_record_types(&cache).unwrap();
        assert!(cache.contains("article"));
    }

    #[test]
    fn test_invalid_ngram_bounds_are_config_errors() {
        let err = SearchSettings::from_json_str(
            r#"{"recordTypes":{"a":{"mode":"all","minLength":5,"maxLength":3}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SearchError::Config { .. }));
    }

    #[test]
    fn test_dialect_override() {
        let settings = SearchSettings::default()
            .with_dialect_override(Some("sqlite"))
            .unwrap();
        assert_eq!(settings.dialect, SqlDialect::Sqlite);

        let kept = settings.clone().with_dialect_override(Some("")).unwrap();
        assert_eq!(kept.dialect, SqlDialect::Sqlite);

        assert!(matches!(
            SearchSettings::default().with_dialect_override(Some("mssql")),
            Err(SearchError::UnknownDialect(_))
        ));
    }

    #[test]
    fn test_from_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"dialect":"sqlite"}}"#).unwrap();
        let settings = SearchSettings::from_json_file(file.path()).unwrap();
        assert_eq!(settings.dialect, SqlDialect::Sqlite);

        let missing = SearchSettings::from_json_file(Path::new("/nonexistent/ngramkit.json"));
        assert!(matches!(missing, Err(SearchError::Io { .. })));
    }
}
