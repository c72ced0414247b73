//! Query-side handlers: predicates, sort resolution and dialect fragments.

use super::{config_param, dialect_param, get_param, get_str_param, require_param, require_str_param};
use crate::server::AppState;
use ngramkit::{
    DateBucket, NgramConfig, PageRequest, SearchPlanner, SearchPredicateBuilder,
};
use serde_json::{json, Value};
use std::sync::Arc;

fn planner_for(state: &AppState, params: &Value) -> ngramkit::Result<SearchPlanner> {
    let dialect = dialect_param(state, params)?;
    if dialect == state.planner.dialect() {
        Ok(state.planner.clone())
    } else {
        Ok(SearchPlanner::new(dialect, Arc::clone(&state.configs)))
    }
}

fn phrase_param(params: &Value) -> Option<&str> {
    get_str_param(params, "phrase", "phrase").filter(|p| !p.trim().is_empty())
}

/// Configuration for a phrase; blank phrases need none.
fn phrase_config(state: &AppState, params: &Value) -> ngramkit::Result<NgramConfig> {
    match phrase_param(params) {
        Some(_) => config_param(state, params),
        None => Ok(NgramConfig::DEFAULT),
    }
}

pub fn build_search_condition(state: &AppState, params: &Value) -> ngramkit::Result<Value> {
    let planner = planner_for(state, params)?;
    let config = phrase_config(state, params)?;
    let condition = planner
        .predicates()
        .build_condition(phrase_param(params), &config)?;
    Ok(serde_json::to_value(condition)?)
}

pub fn build_json_contains_condition(state: &AppState, params: &Value) -> ngramkit::Result<Value> {
    let property = require_str_param(params, "property", "property")?;
    let value: Value = require_param(params, "value", "value")?;
    let builder = SearchPredicateBuilder::new(dialect_param(state, params)?);
    let sql = builder.build_json_contains_condition(&property, &value)?;
    Ok(json!({ "sql": sql }))
}

pub fn resolve_sort(state: &AppState, params: &Value) -> ngramkit::Result<Value> {
    let planner = planner_for(state, params)?;
    let request: PageRequest = get_param(params, "request", "request")?.unwrap_or_default();
    let config = phrase_config(state, params)?;
    let plan = planner.plan_with_config(phrase_param(params), &config, &request)?;
    Ok(serde_json::to_value(plan.sort)?)
}

pub fn plan_search(state: &AppState, params: &Value) -> ngramkit::Result<Value> {
    let planner = planner_for(state, params)?;
    let record_type = require_str_param(params, "record_type", "recordType")?;
    let request: PageRequest = get_param(params, "request", "request")?.unwrap_or_default();
    let plan = planner.plan(&record_type, phrase_param(params), &request)?;
    Ok(serde_json::to_value(plan)?)
}

pub fn build_date_bucket(state: &AppState, params: &Value) -> ngramkit::Result<Value> {
    let column = require_str_param(params, "column", "column")?;
    let bucket: DateBucket = require_str_param(params, "bucket", "bucket")?.parse()?;
    let time_zone = require_str_param(params, "time_zone", "timeZone")?;
    let builder = SearchPredicateBuilder::new(dialect_param(state, params)?);
    let sql = builder.build_date_bucket(&column, bucket, &time_zone)?;
    Ok(json!({ "sql": sql }))
}

pub fn build_date_range(state: &AppState, params: &Value) -> ngramkit::Result<Value> {
    let column = require_str_param(params, "column", "column")?;
    let time_zone = require_str_param(params, "time_zone", "timeZone")?;
    let builder = SearchPredicateBuilder::new(dialect_param(state, params)?);
    let sql = builder.build_date_range(&column, &time_zone)?;
    Ok(json!({ "sql": sql }))
}

pub fn build_next_sequence_value(state: &AppState, params: &Value) -> ngramkit::Result<Value> {
    let sequence = require_str_param(params, "sequence", "sequence")?;
    let builder = SearchPredicateBuilder::new(dialect_param(state, params)?);
    let sql = builder.build_next_sequence_value(&sequence)?;
    Ok(json!({ "sql": sql }))
}

pub fn get_dialect(state: &AppState, params: &Value) -> ngramkit::Result<Value> {
    let dialect = dialect_param(state, params)?;
    Ok(json!({
        "dialect": dialect,
        "max_search_data_length": dialect.max_search_data_length(),
        "lenient_separator": dialect.lenient_separator(),
        "search_rank_property": ngramkit::SearchColumns::SEARCH_RANK_PSEUDOFIELD,
    }))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{call, state};
    use serde_json::json;

    #[tokio::test]
    async fn test_build_search_condition() {
        let result = call(
            &state(),
            "build_search_condition",
            json!({
                "phrase": "test",
                "config": {"mode": "characters", "minLength": 3, "maxLength": 3}
            }),
        )
        .await
        .unwrap();
        assert_eq!(result["query"], "tes OR est");
        assert_eq!(
            result["predicate"],
            "CAST(FULL_TEXT_SEARCH(full_text_search_data, 'tes OR est') AS int) = 1"
        );
    }

    #[tokio::test]
    async fn test_blank_phrase_yields_null_condition() {
        let result = call(&state(), "build_search_condition", json!({"phrase": " "}))
            .await
            .unwrap();
        assert!(result.is_null());
    }

    #[tokio::test]
    async fn test_json_contains_per_dialect() {
        let result = call(
            &state(),
            "build_json_contains_condition",
            json!({"property": "tags", "value": ["rust"], "dialect": "sqlite"}),
        )
        .await
        .unwrap();
        assert_eq!(result["sql"], r#"JSON_CONTAINS(tags, '["rust"]') = 1"#);
    }

    #[tokio::test]
    async fn test_resolve_sort_scenarios() {
        let state = state();
        let paged = json!({"pagination": {"kind": "paged", "page": 0, "size": 10}});

        let ranked = call(&state, "resolve_sort", json!({"phrase": "test", "request": paged}))
            .await
            .unwrap();
        assert_eq!(
            ranked["request"]["sort"],
            json!([{"property": "_searchRank", "direction": "DESC"}])
        );
        assert_eq!(ranked["offset"], 0);
        assert_eq!(ranked["limit"], 10);
        assert!(ranked["orderBy"].as_str().unwrap().ends_with("DESC"));

        let newest = call(&state, "resolve_sort", json!({"phrase": "", "request": paged}))
            .await
            .unwrap();
        assert_eq!(
            newest["request"]["sort"],
            json!([{"property": "createdDate", "direction": "DESC"}])
        );
        assert!(newest["orderBy"].is_null());
    }

    #[tokio::test]
    async fn test_plan_search_requires_registered_type() {
        let state = state();
        let err = call(&state, "plan_search", json!({"record_type": "ghost", "phrase": "x y z"}))
            .await
            .unwrap_err();
        assert_eq!(err.to_rpc_error_code(), -32010);

        call(
            &state,
            "register_record_type",
            json!({"record_type": "ghost", "config": {"mode": "words", "minLength": 1, "maxLength": 5}}),
        )
        .await
        .unwrap();
        let plan = call(&state, "plan_search", json!({"record_type": "ghost", "phrase": "x y z"}))
            .await
            .unwrap();
        assert_eq!(plan["condition"]["query"], "x OR y OR z");
        assert!(plan["sort"]["offset"].is_null());
    }

    #[tokio::test]
    async fn test_date_and_sequence_fragments() {
        let state = state();
        let bucket = call(
            &state,
            "build_date_bucket",
            json!({"column": "created_date", "bucket": "week", "timeZone": "UTC"}),
        )
        .await
        .unwrap();
        assert_eq!(
            bucket["sql"],
            "DATE(DATE_TRUNC('week', created_date AT TIME ZONE 'UTC'))"
        );

        let err = call(
            &state,
            "build_date_bucket",
            json!({"column": "created_date", "bucket": "fortnight", "timeZone": "UTC"}),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_rpc_error_code(), -32005);

        let range = call(
            &state,
            "build_date_range",
            json!({"column": "created_date", "time_zone": "+01:00", "dialect": "sqlite"}),
        )
        .await
        .unwrap();
        assert_eq!(range["sql"], "DATE(created_date, '+01:00') BETWEEN ? AND ?");

        let err = call(
            &state,
            "build_date_range",
            json!({"column": "created_date", "timeZone": "Europe/Paris", "dialect": "sqlite"}),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_rpc_error_code(), -32005);

        let seq = call(&state, "build_next_sequence_value", json!({"sequence": "article_seq"}))
            .await
            .unwrap();
        assert_eq!(seq["sql"], "SELECT nextval('article_seq')");
    }

    #[tokio::test]
    async fn test_get_dialect() {
        let state = state();
        let result = call(&state, "get_dialect", json!({})).await.unwrap();
        assert_eq!(result["dialect"], "postgres");
        assert_eq!(result["max_search_data_length"], 1048575);

        let err = call(&state, "get_dialect", json!({"dialect": "oracle"}))
            .await
            .unwrap_err();
        assert_eq!(err.to_rpc_error_code(), -32010);
    }
}
