//! Record type registration.

use super::{config_param, require_str_param};
use crate::server::AppState;
use ngramkit::SearchError;
use serde_json::{json, Value};

pub fn register_record_type(state: &AppState, params: &Value) -> ngramkit::Result<Value> {
    let record_type = require_str_param(params, "record_type", "recordType")?;
    if params.get("config").map_or(true, Value::is_null) {
        return Err(SearchError::InvalidParams {
            message: "Missing required parameter: config".to_string(),
        });
    }
    let config = config_param(state, params)?;

    state.configs.register(&record_type, config)?;
    Ok(json!({
        "success": true,
        "record_type": record_type,
        "config": config,
    }))
}

pub fn get_record_config(state: &AppState, params: &Value) -> ngramkit::Result<Value> {
    let record_type = require_str_param(params, "record_type", "recordType")?;
    let config = state.configs.get_registered(&record_type)?;
    Ok(serde_json::to_value(config)?)
}
