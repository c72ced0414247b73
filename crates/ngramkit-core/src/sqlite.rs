//! SQLite store functions and a reference document store.
//!
//! SQLite has no n-gram search of its own, so the functions the SQLite dialect templates
//! call are installed on each connection:
//!
//! - `FULL_TEXT_SEARCH(data, query)`: 1 when any `OR` term of `query` is a token of `data`
//! - `FULL_TEXT_SEARCH_RANK(data, query)`: share of the terms found in `data` (0.0..=1.0)
//! - `JSON_CONTAINS(json, candidate)`: 1 when `json` contains `candidate` (PostgreSQL `@>`)
//!
//! [`SearchStore`] persists [`SearchDocument`]s with the two search columns and runs
//! [`SearchPlan`]s against them.

use crate::assembler::{AssembleOutcome, SearchDataAssembler};
use crate::config::{SearchColumns, StoreConfig};
use crate::dialect::SqlDialect;
use crate::error::{Result, SearchError};
use crate::ngram::NgramConfig;
use crate::plan::{SearchPlan, SearchPlanner};
use crate::record::{NamedText, SearchDocument};
use crate::sort::{PageRequest, SortResolution};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Properties a [`SearchStore`] can sort by, besides the relevance pseudo-field.
const SORTABLE_PROPERTIES: [&str; 3] = ["id", "recordType", "createdDate"];

/// Install `FULL_TEXT_SEARCH`, `FULL_TEXT_SEARCH_RANK` and `JSON_CONTAINS` on a connection.
pub fn register_search_functions(conn: &Connection) -> Result<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;

    conn.create_scalar_function("FULL_TEXT_SEARCH", 2, flags, |ctx| {
        let data: Option<String> = ctx.get(0)?;
        let query: Option<String> = ctx.get(1)?;
        let matched = match (data, query) {
            (Some(data), Some(query)) => full_text_match(&data, &query),
            _ => false,
        };
        Ok(i64::from(matched))
    })?;

    conn.create_scalar_function("FULL_TEXT_SEARCH_RANK", 2, flags, |ctx| {
        let data: Option<String> = ctx.get(0)?;
        let query: Option<String> = ctx.get(1)?;
        Ok(match (data, query) {
            (Some(data), Some(query)) => full_text_rank(&data, &query),
            _ => 0.0,
        })
    })?;

    conn.create_scalar_function("JSON_CONTAINS", 2, flags, |ctx| {
        let container: Option<String> = ctx.get(0)?;
        let candidate: Option<String> = ctx.get(1)?;
        let (container, candidate) = match (container, candidate) {
            (Some(a), Some(b)) => (a, b),
            _ => return Ok(0i64),
        };
        let container: Value = serde_json::from_str(&container)
            .map_err(|e| rusqlite::Error::UserFunctionError(Box::new(e)))?;
        let candidate: Value = serde_json::from_str(&candidate)
            .map_err(|e| rusqlite::Error::UserFunctionError(Box::new(e)))?;
        Ok(i64::from(json_contains(&container, &candidate)))
    })?;

    debug!("Registered full-text search functions");
    Ok(())
}

fn query_terms(query: &str) -> impl Iterator<Item = &str> {
    query
        .split(SqlDialect::Sqlite.lenient_separator())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// True when any term of a lenient query is a token of the blob.
pub fn full_text_match(data: &str, query: &str) -> bool {
    let tokens: HashSet<&str> = data.split_whitespace().collect();
    query_terms(query).any(|term| tokens.contains(term))
}

/// Share of the terms of a lenient query that are tokens of the blob.
pub fn full_text_rank(data: &str, query: &str) -> f64 {
    let tokens: HashSet<&str> = data.split_whitespace().collect();
    let (matched, total) = query_terms(query).fold((0u32, 0u32), |(m, t), term| {
        (m + u32::from(tokens.contains(term)), t + 1)
    });
    if total == 0 {
        0.0
    } else {
        f64::from(matched) / f64::from(total)
    }
}

/// PostgreSQL `jsonb @>` containment.
///
/// Objects contain objects whose every key is contained; arrays contain arrays whose every
/// element is contained in some element; a top-level array also contains a bare scalar.
pub fn json_contains(container: &Value, candidate: &Value) -> bool {
    json_contains_at(container, candidate, true)
}

fn json_contains_at(container: &Value, candidate: &Value, top_level: bool) -> bool {
    match (container, candidate) {
        (Value::Object(outer), Value::Object(inner)) => inner.iter().all(|(key, value)| {
            outer
                .get(key)
                .is_some_and(|o| json_contains_at(o, value, false))
        }),
        (Value::Array(outer), Value::Array(inner)) => inner
            .iter()
            .all(|value| outer.iter().any(|o| json_contains_at(o, value, false))),
        (Value::Array(outer), scalar) if top_level && !scalar.is_object() => {
            outer.iter().any(|o| o == scalar)
        }
        (a, b) => a == b,
    }
}

/// An extra WHERE predicate with its positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub sql: String,
    pub params: Vec<String>,
}

impl Filter {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(sql: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// A stored document with its store-managed attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub document: SearchDocument,
    pub attributes: Value,
    pub created_date: String,
}

/// One page of search results.
#[derive(Debug, Clone)]
pub struct SearchPage {
    pub items: Vec<StoredDocument>,
    /// Matches across all pages.
    pub total: u64,
    /// The resolved sort and paging the page was read with.
    pub sort: SortResolution,
}

impl SearchPage {
    /// Number of pages; an unpaged result is a single page.
    pub fn total_pages(&self) -> u64 {
        match self.sort.limit {
            Some(limit) if limit > 0 => self.total.div_ceil(u64::from(limit)),
            _ => 1,
        }
    }

    pub fn has_next(&self) -> bool {
        let seen = self.sort.offset.unwrap_or_default() + self.items.len() as u64;
        seen < self.total
    }
}

/// SQLite-backed store of [`SearchDocument`]s.
pub struct SearchStore {
    db_path: Option<PathBuf>,
    conn: Arc<Mutex<Connection>>,
    assembler: SearchDataAssembler,
}

impl SearchStore {
    /// Create or open a store at the given path.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| SearchError::io_with_path(e, parent))?;
            }
        }

        let conn = Connection::open(&db_path)?;
        conn.execute_batch(&format!(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA busy_timeout={};
            PRAGMA synchronous=NORMAL;
            ",
            StoreConfig::BUSY_TIMEOUT_MS
        ))?;

        let store = Self::with_connection(conn, Some(db_path))?;
        info!("Opened search store at {:?}", store.db_path);
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, None)
    }

    fn with_connection(conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        register_search_functions(&conn)?;
        Self::ensure_schema(&conn)?;
        Ok(Self {
            db_path,
            conn: Arc::new(Mutex::new(conn)),
            assembler: SearchDataAssembler::new(),
        })
    }

    fn ensure_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id TEXT PRIMARY KEY,
                    record_type TEXT NOT NULL,
                    sources_json TEXT NOT NULL,
                    ngram_config_json TEXT NOT NULL,
                    attributes TEXT NOT NULL,
                    created_date TEXT NOT NULL,
                    {data} TEXT,
                    {checksum} TEXT
                )",
                table = StoreConfig::TABLE,
                data = SearchColumns::SEARCH_DATA,
                checksum = SearchColumns::SEARCH_DATA_CHECKSUM,
            ),
            [],
        )?;
        conn.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_type ON {table}(record_type)",
                table = StoreConfig::TABLE
            ),
            [],
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| SearchError::Database {
            message: "Failed to acquire connection lock".to_string(),
            source: None,
        })
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Insert or update a document, rebuilding its search data when the text changed.
    ///
    /// The stored checksum is loaded first, so saving unchanged text skips n-gram work
    /// even if the caller built the document from scratch. `created_date` is kept from
    /// the first insert; `None` means now.
    pub fn save(
        &self,
        document: &mut SearchDocument,
        attributes: &Value,
        created_date: Option<&str>,
    ) -> Result<AssembleOutcome> {
        let id = document
            .id
            .clone()
            .ok_or_else(|| SearchError::invalid("id", "document has no id"))?;
        let conn = self.lock()?;

        let stored: Option<(Option<String>, Option<String>)> = conn
            .query_row(
                &format!(
                    "SELECT {data}, {checksum} FROM {table} WHERE id = ?1",
                    data = SearchColumns::SEARCH_DATA,
                    checksum = SearchColumns::SEARCH_DATA_CHECKSUM,
                    table = StoreConfig::TABLE
                ),
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        if let Some((data, checksum)) = stored {
            if document.search_data_checksum.is_none() {
                document.search_data = data;
                document.search_data_checksum = checksum;
            }
        }

        let outcome = self.assembler.assemble(document);

        conn.execute(
            &format!(
                "INSERT INTO {table} (id, record_type, sources_json, ngram_config_json,
                                      attributes, created_date, {data}, {checksum})
                 VALUES (?1, ?2, ?3, ?4, ?5,
                         COALESCE(?6, STRFTIME('%Y-%m-%d %H:%M:%f', 'now')), ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                     record_type=excluded.record_type,
                     sources_json=excluded.sources_json,
                     ngram_config_json=excluded.ngram_config_json,
                     attributes=excluded.attributes,
                     {data}=excluded.{data},
                     {checksum}=excluded.{checksum}",
                table = StoreConfig::TABLE,
                data = SearchColumns::SEARCH_DATA,
                checksum = SearchColumns::SEARCH_DATA_CHECKSUM,
            ),
            params![
                id,
                document.record_type,
                serde_json::to_string(&document.sources)?,
                serde_json::to_string(&document.ngram_config)?,
                serde_json::to_string(attributes)?,
                created_date,
                document.search_data,
                document.search_data_checksum,
            ],
        )?;

        debug!("Saved [{}] ID '{}': {:?}", document.record_type, id, outcome);
        Ok(outcome)
    }

    /// Get a document by ID.
    pub fn get(&self, id: &str) -> Result<Option<StoredDocument>> {
        let conn = self.lock()?;
        let result = conn
            .query_row(
                &format!("{} WHERE id = ?1", select_columns()),
                params![id],
                Self::row_to_document,
            )
            .optional()?;
        Ok(result)
    }

    /// Delete a document by ID.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let rows = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", StoreConfig::TABLE),
            params![id],
        )?;
        Ok(rows > 0)
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", StoreConfig::TABLE),
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Compose the SELECT for a plan. The record type is the first `?` parameter,
    /// followed by the parameters of `filters` in order.
    pub fn compose_select(
        &self,
        planner: &SearchPlanner,
        plan: &SearchPlan,
        filters: &[Filter],
    ) -> Result<String> {
        let mut sql = format!("{}{}", select_columns(), where_clause(planner, plan, filters)?);

        if !plan.sort.is_ranked() {
            for order in plan.sort.request.sort.orders() {
                if !SORTABLE_PROPERTIES.contains(&order.property.as_str()) {
                    return Err(SearchError::invalid(
                        "sort",
                        format!("cannot sort by '{}'", order.property),
                    ));
                }
            }
        }
        if let Some(order_by) = planner.sorter().order_by_clause(&plan.sort)? {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order_by);
        }

        if let (Some(limit), Some(offset)) = (plan.sort.limit, plan.sort.offset) {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));
        }
        Ok(sql)
    }

    /// Compose the COUNT over every page of a plan; same parameters as
    /// [`SearchStore::compose_select`].
    pub fn compose_count(
        &self,
        planner: &SearchPlanner,
        plan: &SearchPlan,
        filters: &[Filter],
    ) -> Result<String> {
        Ok(format!(
            "SELECT COUNT(*) FROM {}{}",
            StoreConfig::TABLE,
            where_clause(planner, plan, filters)?
        ))
    }

    /// Plan and run a search over one record type.
    ///
    /// The total is counted with a separate query unless the page itself proves it
    /// (first page not full, or a short last page).
    pub fn search(
        &self,
        planner: &SearchPlanner,
        record_type: &str,
        phrase: Option<&str>,
        request: &PageRequest,
        filters: &[Filter],
    ) -> Result<SearchPage> {
        let plan = planner.plan(record_type, phrase, request)?;
        let select = self.compose_select(planner, &plan, filters)?;
        debug!("Search SQL: {}", select);

        let mut params: Vec<&str> = vec![record_type];
        params.extend(filters.iter().flat_map(|f| f.params.iter().map(String::as_str)));

        let conn = self.lock()?;
        let items = {
            let mut stmt = conn.prepare(&select)?;
            let rows = stmt.query_map(params_from_iter(params.iter()), Self::row_to_document)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let total = match known_total(plan.sort.offset, plan.sort.limit, items.len()) {
            Some(total) => total,
            None => {
                let count = self.compose_count(planner, &plan, filters)?;
                debug!("Count SQL: {}", count);
                let total: i64 =
                    conn.query_row(&count, params_from_iter(params.iter()), |row| row.get(0))?;
                u64::try_from(total).unwrap_or_default()
            }
        };

        Ok(SearchPage {
            items,
            total,
            sort: plan.sort,
        })
    }

    fn row_to_document(row: &Row) -> rusqlite::Result<StoredDocument> {
        let sources: Vec<NamedText> = json_column(row, 2)?;
        let ngram_config: NgramConfig = json_column(row, 3)?;
        let attributes: Value = json_column(row, 4)?;

        let mut document = SearchDocument::new(row.get::<_, String>(1)?, SqlDialect::Sqlite)
            .with_id(row.get::<_, String>(0)?)
            .with_config(ngram_config);
        document.sources = sources;
        document.search_data = row.get(6)?;
        document.search_data_checksum = row.get(7)?;

        Ok(StoredDocument {
            document,
            attributes,
            created_date: row.get(5)?,
        })
    }
}

/// ` WHERE ...` shared by the page and count queries.
fn where_clause(planner: &SearchPlanner, plan: &SearchPlan, filters: &[Filter]) -> Result<String> {
    if planner.dialect() != SqlDialect::Sqlite {
        return Err(SearchError::config(format!(
            "SQLite store cannot run {} fragments",
            planner.dialect()
        )));
    }

    let mut sql = String::from(" WHERE record_type = ?");
    for filter in filters {
        sql.push_str(" AND (");
        sql.push_str(&filter.sql);
        sql.push(')');
    }
    if let Some(predicate) = plan.predicate() {
        sql.push_str(" AND ");
        sql.push_str(predicate);
    }
    Ok(sql)
}

/// Total implied by the page alone, if any.
fn known_total(offset: Option<u64>, limit: Option<u32>, fetched: usize) -> Option<u64> {
    let fetched = fetched as u64;
    match (offset, limit) {
        (Some(offset), Some(limit)) if fetched < u64::from(limit) => {
            if offset == 0 || fetched > 0 {
                Some(offset + fetched)
            } else {
                None
            }
        }
        (Some(_), Some(_)) => None,
        _ => Some(fetched),
    }
}

fn json_column<T: DeserializeOwned>(row: &Row, index: usize) -> rusqlite::Result<T> {
    let text: String = row.get(index)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

fn select_columns() -> String {
    format!(
        "SELECT id, record_type, sources_json, ngram_config_json, attributes, created_date, \
         {data}, {checksum} FROM {table}",
        data = SearchColumns::SEARCH_DATA,
        checksum = SearchColumns::SEARCH_DATA_CHECKSUM,
        table = StoreConfig::TABLE
    )
}
