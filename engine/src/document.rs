//! Document value model.
//!
//! Documents are plain [`serde_json::Value`] trees. The crate enables
//! `preserve_order`, so object members keep their insertion order when a
//! document is re-serialized. Comparisons that must be byte-exact go through
//! [`to_canonical_string`], which sorts object keys recursively.

use crate::{error::Result, Error};
use serde_json::{Map, Value};

/// Parse raw JSON bytes into a document.
pub fn parse_document(bytes: &[u8]) -> Result<Value> {
    serde_json::from_slice(bytes).map_err(|e| Error::InvalidDocument(e.to_string()))
}

/// Serialize a document as it is, keeping member order.
pub fn to_json_string(doc: &Value) -> Result<String> {
    serde_json::to_string(doc).map_err(|e| Error::InvalidDocument(e.to_string()))
}

/// Return a copy of `doc` with every object's keys in sorted order.
pub fn canonicalize(doc: &Value) -> Value {
    match doc {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key.as_str()]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        scalar => scalar.clone(),
    }
}

/// Serialize with sorted object keys.
///
/// Two structurally equal documents always produce identical output.
pub fn to_canonical_string(doc: &Value) -> Result<String> {
    to_json_string(&canonicalize(doc))
}

/// Name of the JSON type of `value`.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
