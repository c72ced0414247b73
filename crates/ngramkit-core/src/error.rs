//! Error types for ngramkit.
//!
//! Search augmentation fails loudly only at the fragment-building boundary: bad phrases,
//! bad identifiers and missing record configuration. Pure computations (n-grams, checksums)
//! have no error path.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for ngramkit.
#[derive(Debug, Error)]
pub enum SearchError {
    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Record type not registered for full-text search: {record_type}")]
    UnknownRecordType { record_type: String },

    #[error("Unknown SQL dialect: {0}")]
    UnknownDialect(String),

    // Validation errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Database errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("Invalid params: {message}")]
    InvalidParams { message: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for ngramkit operations.
pub type Result<T> = std::result::Result<T, SearchError>;

impl From<std::io::Error> for SearchError {
    fn from(err: std::io::Error) -> Self {
        SearchError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(err: rusqlite::Error) -> Self {
        SearchError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl SearchError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        SearchError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a validation error for the given field.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        SearchError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        SearchError::Config {
            message: message.into(),
        }
    }

    /// True for errors caused by caller input rather than by setup.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            SearchError::Validation { .. } | SearchError::InvalidParams { .. }
        )
    }

    /// Convert to a JSON-RPC error code.
    ///
    /// Standard codes: -32602 invalid params, -32603 internal error.
    /// Application codes:
    /// - -32005: Validation error (rejected phrase, identifier or value)
    /// - -32010: Configuration error (unregistered record type, bad n-gram config, dialect)
    pub fn to_rpc_error_code(&self) -> i32 {
        match self {
            SearchError::InvalidParams { .. } => -32602,

            SearchError::Validation { .. } => -32005,

            SearchError::Config { .. }
            | SearchError::UnknownRecordType { .. }
            | SearchError::UnknownDialect(_) => -32010,

            _ => -32603,
        }
    }
}
