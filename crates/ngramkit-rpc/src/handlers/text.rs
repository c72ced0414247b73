//! Indexing-side handlers: n-grams, checksums and blob assembly.

use super::{config_param, require_param, require_str_param};
use crate::server::AppState;
use ngramkit::{checksum, SearchDataAssembler, SearchDocument, SearchableRecord};
use serde_json::{json, Value};

pub fn generate_ngrams(state: &AppState, params: &Value) -> ngramkit::Result<Value> {
    let text = require_str_param(params, "text", "text")?;
    let config = config_param(state, params)?;
    let ngrams = config.generate(&text);
    Ok(json!({
        "config": config,
        "ngrams": ngrams.as_slice(),
    }))
}

pub fn compute_checksum(_state: &AppState, params: &Value) -> ngramkit::Result<Value> {
    let text = require_str_param(params, "text", "text")?;
    Ok(json!({ "checksum": checksum::compute(&text) }))
}

/// Run the assembler over a document sent by the caller and return it updated.
///
/// A registered record type overrides the document's own n-gram configuration, so
/// callers cannot index with a different configuration than the query side uses.
pub fn assemble_search_data(state: &AppState, params: &Value) -> ngramkit::Result<Value> {
    let mut document: SearchDocument = require_param(params, "document", "document")?;
    if let Ok(config) = state.configs.get_registered(document.record_type()) {
        document.ngram_config = config;
    }

    let outcome = SearchDataAssembler::new().assemble(&mut document);
    Ok(json!({
        "outcome": outcome,
        "document": document,
    }))
}
