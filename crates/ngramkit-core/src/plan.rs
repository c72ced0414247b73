//! One-call query planning: predicate plus ordering for a search phrase.

use crate::config_cache::ConfigCache;
use crate::dialect::SqlDialect;
use crate::error::Result;
use crate::ngram::NgramConfig;
use crate::predicate::{FullTextCondition, SearchPredicateBuilder};
use crate::record::StaticSearchConfig;
use crate::sort::{PageRequest, SortCriteriaResolver, SortResolution};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Everything a query layer needs to run a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPlan {
    pub condition: Option<FullTextCondition>,
    pub sort: SortResolution,
}

impl SearchPlan {
    /// WHERE fragment of the full-text condition, if any.
    pub fn predicate(&self) -> Option<&str> {
        self.condition.as_ref().map(|c| c.predicate.as_str())
    }
}

/// Builds [`SearchPlan`]s for one dialect, looking record configuration up in a
/// [`ConfigCache`].
#[derive(Debug, Clone)]
pub struct SearchPlanner {
    predicates: SearchPredicateBuilder,
    sorter: SortCriteriaResolver,
    configs: Arc<ConfigCache>,
}

impl SearchPlanner {
    pub fn new(dialect: SqlDialect, configs: Arc<ConfigCache>) -> Self {
        Self {
            predicates: SearchPredicateBuilder::new(dialect),
            sorter: SortCriteriaResolver::new(dialect),
            configs,
        }
    }

    /// Rank and match against a qualified or renamed search column.
    pub fn with_search_column(mut self, column: &str) -> Result<Self> {
        self.predicates = self.predicates.with_search_column(column)?;
        self.sorter = self.sorter.with_search_column(column)?;
        Ok(self)
    }

    pub fn dialect(&self) -> SqlDialect {
        self.predicates.dialect()
    }

    pub fn predicates(&self) -> &SearchPredicateBuilder {
        &self.predicates
    }

    pub fn sorter(&self) -> &SortCriteriaResolver {
        &self.sorter
    }

    pub fn configs(&self) -> &ConfigCache {
        &self.configs
    }

    /// Plan a search over a registered record type.
    ///
    /// The record type is only looked up when the phrase is non-blank, so listing
    /// records of unregistered types still works.
    pub fn plan(
        &self,
        record_type: &str,
        phrase: Option<&str>,
        request: &PageRequest,
    ) -> Result<SearchPlan> {
        let condition = match phrase {
            Some(p) if !p.trim().is_empty() => {
                let config = self.configs.get_registered(record_type)?;
                self.predicates.build_condition(Some(p), &config)?
            }
            _ => None,
        };
        self.finish(condition, request)
    }

    /// Plan a search over a statically configured record type.
    pub fn plan_for<R: StaticSearchConfig>(
        &self,
        phrase: Option<&str>,
        request: &PageRequest,
    ) -> Result<SearchPlan> {
        let config = self.configs.get::<R>();
        self.plan_with_config(phrase, &config, request)
    }

    /// Plan a search with an explicit configuration.
    pub fn plan_with_config(
        &self,
        phrase: Option<&str>,
        config: &NgramConfig,
        request: &PageRequest,
    ) -> Result<SearchPlan> {
        let condition = self.predicates.build_condition(phrase, config)?;
        self.finish(condition, request)
    }

    fn finish(&self, condition: Option<FullTextCondition>, request: &PageRequest) -> Result<SearchPlan> {
        let sort = self.sorter.resolve(condition.as_ref(), request)?;
        Ok(SearchPlan { condition, sort })
    }
}
