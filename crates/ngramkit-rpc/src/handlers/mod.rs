//! JSON-RPC request handlers, split by domain.

mod query;
mod records;
mod text;

use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use ngramkit::{NgramConfig, SearchError, SqlDialect};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, warn};

// ============================================================================
// JSON-RPC types
// ============================================================================

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 error structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
            id,
        }
    }
}

// ============================================================================
// Parameter extraction helpers
// ============================================================================

/// Extract an optional string parameter, supporting both snake_case and camelCase.
pub(crate) fn get_str_param<'a>(params: &'a Value, snake: &str, camel: &str) -> Option<&'a str> {
    params
        .get(snake)
        .or_else(|| params.get(camel))
        .and_then(|v| v.as_str())
}

/// Extract a required string parameter or return an error.
pub(crate) fn require_str_param(
    params: &Value,
    snake: &str,
    camel: &str,
) -> ngramkit::Result<String> {
    get_str_param(params, snake, camel)
        .map(String::from)
        .ok_or_else(|| SearchError::InvalidParams {
            message: format!("Missing required parameter: {}", snake),
        })
}

/// Extract and deserialize an optional structured parameter.
///
/// A present but malformed value is an error; configuration values that fail their own
/// validation keep their configuration error code.
pub(crate) fn get_param<T: DeserializeOwned>(
    params: &Value,
    snake: &str,
    camel: &str,
) -> ngramkit::Result<Option<T>> {
    match params.get(snake).or_else(|| params.get(camel)) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| SearchError::InvalidParams {
                message: format!("Invalid parameter {}: {}", snake, e),
            }),
    }
}

/// Extract and deserialize a required structured parameter.
pub(crate) fn require_param<T: DeserializeOwned>(
    params: &Value,
    snake: &str,
    camel: &str,
) -> ngramkit::Result<T> {
    get_param(params, snake, camel)?.ok_or_else(|| SearchError::InvalidParams {
        message: format!("Missing required parameter: {}", snake),
    })
}

/// Dialect named in the request, or the server's configured one.
pub(crate) fn dialect_param(state: &AppState, params: &Value) -> ngramkit::Result<SqlDialect> {
    match get_str_param(params, "dialect", "dialect") {
        Some(name) => name.parse(),
        None => Ok(state.settings.dialect),
    }
}

/// N-gram configuration for a request: an explicit `config`, else the registered
/// configuration of `record_type`, else the default.
pub(crate) fn config_param(state: &AppState, params: &Value) -> ngramkit::Result<NgramConfig> {
    if let Some(raw) = params.get("config").filter(|v| !v.is_null()) {
        // validation failures of an explicit config are configuration errors
        return serde_json::from_value(raw.clone())
            .map_err(|e| SearchError::config(format!("Invalid n-gram config: {}", e)));
    }
    match get_str_param(params, "record_type", "recordType") {
        Some(record_type) => state.configs.get_registered(record_type),
        None => Ok(NgramConfig::DEFAULT),
    }
}

// ============================================================================
// HTTP endpoints
// ============================================================================

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Main JSON-RPC handler.
pub async fn handle_rpc(
    State(state): State<Arc<AppState>>,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    let method = &request.method;
    let params = request.params.unwrap_or(Value::Object(Default::default()));
    let id = request.id.clone();

    debug!("RPC call: {}({:?})", method, params);

    // Handle built-in methods
    if method == "health_check" {
        return (
            StatusCode::OK,
            Json(JsonRpcResponse::success(id, json!({"status": "ok"}))),
        );
    }

    let result = dispatch_method(&state, method, &params).await;

    match result {
        Ok(value) => (StatusCode::OK, Json(JsonRpcResponse::success(id, value))),
        Err(e) => {
            if e.is_invalid_input() {
                warn!("Rejected RPC call {}: {}", method, e);
            } else {
                error!("RPC error for {}: {}", method, e);
            }
            let code = e.to_rpc_error_code();
            (
                StatusCode::OK,
                Json(JsonRpcResponse::error(id, code, e.to_string())),
            )
        }
    }
}

// ============================================================================
// Method dispatcher
// ============================================================================

/// Dispatch a method call to the appropriate domain handler.
async fn dispatch_method(state: &AppState, method: &str, params: &Value) -> ngramkit::Result<Value> {
    match method {
        // Indexing side
        "generate_ngrams" => text::generate_ngrams(state, params),
        "compute_checksum" => text::compute_checksum(state, params),
        "assemble_search_data" => text::assemble_search_data(state, params),

        // Record types
        "register_record_type" => records::register_record_type(state, params),
        "get_record_config" => records::get_record_config(state, params),

        // Query side
        "build_search_condition" => query::build_search_condition(state, params),
        "build_json_contains_condition" => query::build_json_contains_condition(state, params),
        "resolve_sort" => query::resolve_sort(state, params),
        "plan_search" => query::plan_search(state, params),
        "build_date_bucket" => query::build_date_bucket(state, params),
        "build_date_range" => query::build_date_range(state, params),
        "build_next_sequence_value" => query::build_next_sequence_value(state, params),
        "get_dialect" => query::get_dialect(state, params),

        _ => {
            warn!("Unknown method: {}", method);
            Err(SearchError::InvalidParams {
                message: format!("Method not found: {}", method),
            })
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{call, state};
    use super::*;
    use crate::server::build_router;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_unknown_method() {
        let err = call(&state(), "drop_everything", json!({})).await.unwrap_err();
        assert_eq!(err.to_rpc_error_code(), -32602);
    }

    #[test]
    fn test_param_helpers_accept_camel_case() {
        let params = json!({"recordType": "article", "time_zone": "UTC"});
        assert_eq!(get_str_param(&params, "record_type", "recordType"), Some("article"));
        assert_eq!(
            require_str_param(&params, "time_zone", "timeZone").unwrap(),
            "UTC"
        );
        assert!(require_str_param(&params, "phrase", "phrase").is_err());
    }

    #[test]
    fn test_get_param_rejects_malformed_values() {
        let params = json!({"request": {"pagination": "sideways"}});
        let err = get_param::<ngramkit::PageRequest>(&params, "request", "request").unwrap_err();
        assert_eq!(err.to_rpc_error_code(), -32602);
        assert!(get_param::<ngramkit::PageRequest>(&json!({}), "request", "request")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_config_param_resolution() {
        let state = state();
        assert_eq!(config_param(&state, &json!({})).unwrap(), NgramConfig::DEFAULT);

        let err = config_param(
            &state,
            &json!({"config": {"mode": "all", "minLength": 0, "maxLength": 3}}),
        )
        .unwrap_err();
        assert_eq!(err.to_rpc_error_code(), -32010);

        let err = config_param(&state, &json!({"record_type": "ghost"})).unwrap_err();
        assert_eq!(err.to_rpc_error_code(), -32010);
    }

    #[tokio::test]
    async fn test_rpc_envelope() {
        let app = build_router(Arc::new(state()));
        let body = json!({
            "jsonrpc": "2.0",
            "method": "build_json_contains_condition",
            "params": {"property": "name; DROP TABLE x", "value": "v"},
            "id": 42
        });
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/rpc")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["id"], 42);
        assert_eq!(json["error"]["code"], -32005);
        assert!(json.get("result").is_none());
    }
}
