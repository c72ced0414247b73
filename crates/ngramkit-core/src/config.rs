//! Centralized constants for ngramkit.
//!
//! Column names, reserved property names and sizing defaults shared by the indexing
//! and query sides.

/// Names of the persisted search columns and reserved properties.
pub struct SearchColumns;

impl SearchColumns {
    /// Column holding the accumulated n-gram blob.
    pub const SEARCH_DATA: &'static str = "full_text_search_data";
    /// Column holding the checksum of the raw source text.
    pub const SEARCH_DATA_CHECKSUM: &'static str = "full_text_search_data_checksum";
    /// Non-persisted sort property meaning "order by search rank, descending".
    pub const SEARCH_RANK_PSEUDOFIELD: &'static str = "_searchRank";
    /// Sort property used when nothing better is available (newest first).
    pub const CREATED_DATE_PROPERTY: &'static str = "createdDate";
}

/// Sizing hints for text accumulation.
pub struct AssemblyConfig;

impl AssemblyConfig {
    /// Initial capacity of the n-gram blob builder.
    pub const ESTIMATED_BLOB_CAPACITY: usize = 1024;
    /// Estimated length of one text source, used to size the raw-text buffer.
    pub const ESTIMATED_SOURCE_LENGTH: usize = 50;
}

/// Defaults for n-gram generation.
pub struct NgramDefaults;

impl NgramDefaults {
    pub const MIN_LENGTH: usize = 3;
    pub const MAX_LENGTH: usize = 5;
    /// Upper bound for any configured maximum; windows per word grow with its square.
    pub const MAX_LENGTH_LIMIT: usize = 32;
}

/// Environment and file configuration keys.
pub struct SettingsKeys;

impl SettingsKeys {
    /// Environment variable selecting the active SQL dialect.
    pub const DIALECT_ENV: &'static str = "NGRAMKIT_DIALECT";
    /// Environment variable pointing at a JSON settings file.
    pub const SETTINGS_FILE_ENV: &'static str = "NGRAMKIT_SETTINGS";
}

/// SQLite reference store layout.
pub struct StoreConfig;

impl StoreConfig {
    /// Table holding searchable documents.
    pub const TABLE: &'static str = "search_records";
    /// Busy timeout applied to file-backed connections.
    pub const BUSY_TIMEOUT_MS: u32 = 30_000;
}
