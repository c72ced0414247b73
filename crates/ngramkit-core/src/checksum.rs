//! Stable checksums of raw search text.
//!
//! The input is JSON-encoded before hashing so that the digest covers an unambiguous
//! representation of the text (including the empty string). Output is SHA-256 in
//! standard base64, short enough for a plain string column.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Checksum of a text value.
pub fn compute(text: &str) -> String {
    // a &str always serializes
    let json = serde_json::to_string(text).unwrap_or_default();
    digest(json.as_bytes())
}

/// Checksum of any serializable value, via its JSON representation.
pub fn compute_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let json = serde_json::to_vec(value)?;
    Ok(digest(&json))
}

fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    STANDARD.encode(hasher.finalize())
}
