//! ngramkit - Fuzzy n-gram full-text search for relational records.
//!
//! Records keep an n-gram blob and a checksum of their raw text next to their other
//! columns. The write path rebuilds the blob only when the checksum changes; the query
//! path turns a search phrase into a lenient (any n-gram) predicate plus a relevance
//! ORDER BY, rendered for the active SQL dialect.
//!
//! # Example
//!
//! ```rust,ignore
//! use ngramkit::{
//!     ConfigCache, PageRequest, SearchDataAssembler, SearchDocument, SearchPlanner, SqlDialect,
//! };
//! use std::sync::Arc;
//!
//! let mut doc = SearchDocument::new("article", SqlDialect::Postgres)
//!     .with_id("a-1")
//!     .source("title", Some("Café Münster"));
//! SearchDataAssembler::new().assemble(&mut doc);
//!
//! let configs = Arc::new(ConfigCache::new());
//! configs.register("article", doc.ngram_config)?;
//! let plan = SearchPlanner::new(SqlDialect::Postgres, configs)
//!     .plan("article", Some("munster"), &PageRequest::of(0, 20))?;
//! println!("WHERE {:?} ORDER BY {:?}", plan.predicate(), plan.sort.order_by);
//! ```

pub mod assembler;
pub mod checksum;
pub mod config;
pub mod config_cache;
pub mod dialect;
pub mod error;
pub mod naming;
pub mod ngram;
pub mod plan;
pub mod predicate;
pub mod record;
pub mod settings;
pub mod sort;
pub mod sqlite;
pub mod template;

// Re-export commonly used types
pub use assembler::{AssembleOutcome, SearchDataAssembler, WriteKind, WritePipeline, WriteStage};
pub use config::SearchColumns;
pub use config_cache::ConfigCache;
pub use dialect::{DateBucket, SqlDialect};
pub use error::{Result, SearchError};
pub use ngram::{generate, NgramConfig, NgramMode, NgramSet};
pub use plan::{SearchPlan, SearchPlanner};
pub use predicate::{FullTextCondition, SearchPredicateBuilder};
pub use record::{NamedText, SearchDocument, SearchableRecord, StaticSearchConfig, TextSource};
pub use settings::SearchSettings;
pub use sort::{
    init_sort_criteria, Direction, Order, PageRequest, Pagination, Sort, SortCriteriaResolver,
    SortResolution,
};
pub use sqlite::{register_search_functions, Filter, SearchPage, SearchStore, StoredDocument};
