//! Pagination and relevance ordering.
//!
//! Callers ask for relevance ordering with the reserved pseudo-field `_searchRank`. It is
//! not a column: when a search condition is active it is replaced by the dialect's rank
//! expression, and without a condition it falls back to newest first.

use crate::config::SearchColumns;
use crate::dialect::SqlDialect;
use crate::error::Result;
use crate::naming;
use crate::predicate::FullTextCondition;
use crate::template::render;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub property: String,
    #[serde(default)]
    pub direction: Direction,
}

impl Order {
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Desc,
        }
    }

    pub fn is_search_rank(&self) -> bool {
        self.property == SearchColumns::SEARCH_RANK_PSEUDOFIELD
    }
}

/// Ordered list of sort keys. Empty means unsorted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sort(Vec<Order>);

impl Sort {
    pub fn unsorted() -> Self {
        Self(Vec::new())
    }

    pub fn by(orders: Vec<Order>) -> Self {
        Self(orders)
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self(vec![Order::desc(property)])
    }

    pub fn asc(property: impl Into<String>) -> Self {
        Self(vec![Order::asc(property)])
    }

    /// Sort by relevance, best match first.
    pub fn by_search_rank() -> Self {
        Self::desc(SearchColumns::SEARCH_RANK_PSEUDOFIELD)
    }

    pub fn is_sorted(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn orders(&self) -> &[Order] {
        &self.0
    }

    pub fn order_for(&self, property: &str) -> Option<&Order> {
        self.0.iter().find(|o| o.property == property)
    }

    /// True if the caller asked for relevance ordering.
    pub fn requests_search_rank(&self) -> bool {
        self.0.iter().any(Order::is_search_rank)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Pagination {
    Paged {
        page: u32,
        size: u32,
    },
    #[default]
    Unpaged,
}

/// Pagination plus sort, as received from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub pagination: Pagination,
    #[serde(default)]
    pub sort: Sort,
}

impl PageRequest {
    pub fn of(page: u32, size: u32) -> Self {
        Self::of_sorted(page, size, Sort::unsorted())
    }

    pub fn of_sorted(page: u32, size: u32, sort: Sort) -> Self {
        Self {
            pagination: Pagination::Paged { page, size },
            sort,
        }
    }

    pub fn unpaged() -> Self {
        Self::default()
    }

    pub fn unpaged_sorted(sort: Sort) -> Self {
        Self {
            pagination: Pagination::Unpaged,
            sort,
        }
    }

    pub fn is_paged(&self) -> bool {
        matches!(self.pagination, Pagination::Paged { .. })
    }

    /// Same pagination, different sort.
    pub fn with_sort(&self, sort: Sort) -> Self {
        Self {
            pagination: self.pagination,
            sort,
        }
    }

    pub fn offset(&self) -> Option<u64> {
        match self.pagination {
            Pagination::Paged { page, size } => Some(u64::from(page) * u64::from(size)),
            Pagination::Unpaged => None,
        }
    }

    pub fn limit(&self) -> Option<u32> {
        match self.pagination {
            Pagination::Paged { size, .. } => Some(size),
            Pagination::Unpaged => None,
        }
    }
}

/// Effective pagination after relevance resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortResolution {
    pub request: PageRequest,
    /// Rank expression plus direction, set only when ordering by relevance.
    pub order_by: Option<String>,
    pub offset: Option<u64>,
    pub limit: Option<u32>,
}

impl SortResolution {
    fn new(request: PageRequest, order_by: Option<String>) -> Self {
        let offset = request.offset();
        let limit = request.limit();
        Self {
            request,
            order_by,
            offset,
            limit,
        }
    }

    pub fn is_ranked(&self) -> bool {
        self.order_by.is_some()
    }
}

/// Rewrite the sort of `request` for a search `phrase`.
///
/// A sort on real fields is kept. An unsorted request, or one sorted by the pseudo-field,
/// becomes relevance-descending when the phrase is non-blank and `createdDate`-descending
/// otherwise. Pagination is never changed.
pub fn init_sort_criteria(phrase: Option<&str>, request: &PageRequest) -> PageRequest {
    let has_phrase = phrase.is_some_and(|p| !p.trim().is_empty());
    rewrite_sort(has_phrase, request)
}

fn rewrite_sort(has_phrase: bool, request: &PageRequest) -> PageRequest {
    if request.sort.is_sorted() && !request.sort.requests_search_rank() {
        return request.clone();
    }

    if has_phrase {
        request.with_sort(Sort::by_search_rank())
    } else {
        request.with_sort(Sort::desc(SearchColumns::CREATED_DATE_PROPERTY))
    }
}

/// Resolves relevance ordering into SQL for one dialect.
#[derive(Debug, Clone)]
pub struct SortCriteriaResolver {
    dialect: SqlDialect,
    search_column: String,
}

impl SortCriteriaResolver {
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            search_column: SearchColumns::SEARCH_DATA.to_string(),
        }
    }

    /// Rank against a qualified or renamed search column.
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

    /// Resolve the effective request and, for relevance ordering, the rank ORDER BY.
    pub fn resolve(
        &self,
        condition: Option<&FullTextCondition>,
        request: &PageRequest,
    ) -> Result<SortResolution> {
        let effective = rewrite_sort(condition.is_some(), request);

        let order_by = match condition {
            Some(condition) if effective.sort.requests_search_rank() => {
                let rank = render(
                    self.dialect.full_text_search_rank_template(),
                    &[&self.search_column, &condition.query],
                )?;
                Some(format!("{} {}", rank, Direction::Desc.as_sql()))
            }
            _ => None,
        };

        debug!(
            "Resolved sort {:?} (ranked: {})",
            effective.sort,
            order_by.is_some()
        );
        Ok(SortResolution::new(effective, order_by))
    }

    /// Full ORDER BY body for a resolution: the rank expression, or the real-field
    /// orders mapped to snake_case columns. `None` when nothing is sorted.
    pub fn order_by_clause(&self, resolution: &SortResolution) -> Result<Option<String>> {
        if let Some(rank) = &resolution.order_by {
            return Ok(Some(rank.clone()));
        }

        let orders = resolution.request.sort.orders();
        if orders.is_empty() {
            return Ok(None);
        }

        let mut parts = Vec::with_capacity(orders.len());
        for order in orders {
            let column = naming::column_for_property(&order.property)?;
            parts.push(format!("{} {}", column, order.direction.as_sql()));
        }
        Ok(Some(parts.join(", ")))
    }
}
