//! Ordered patches and the patch application engine.
//!
//! Operations run strictly in sequence, each against the tree produced by the
//! previous one. [`apply`] works on a private copy of the input document, so
//! a failure part-way through never exposes a half-patched tree.

use crate::{document, error::Result, pointer, Error, Operation};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An ordered list of operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch(Vec<Operation>);

impl Patch {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Parse a patch from its JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidPatch(e.to_string()))
    }

    /// Parse a patch from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::InvalidPatch(e.to_string()))
    }

    /// Parse a patch from an already decoded JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::InvalidPatch(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidPatch(e.to_string()))
    }

    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| Error::InvalidPatch(e.to_string()))
    }

    pub fn push(&mut self, op: Operation) {
        self.0.push(op);
    }

    pub fn operations(&self) -> &[Operation] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Operation>> for Patch {
    fn from(ops: Vec<Operation>) -> Self {
        Self(ops)
    }
}

impl FromIterator<Operation> for Patch {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Patch {
    type Item = Operation;
    type IntoIter = std::vec::IntoIter<Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Patch {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Apply `patch` to a copy of `doc` and return the patched copy.
///
/// On failure the error is [`Error::OperationFailed`] carrying the index of
/// the operation that failed; `doc` is never touched.
pub fn apply(doc: &Value, patch: &Patch) -> Result<Value> {
    let mut target = doc.clone();
    for (index, op) in patch.iter().enumerate() {
        apply_operation(&mut target, op).map_err(|e| Error::OperationFailed {
            index,
            source: Box::new(e),
        })?;
    }
    Ok(target)
}

/// Apply a single operation in place.
///
/// Only `move` can fail after mutating: if its destination is rejected the
/// source has already been removed. Use [`apply`] when atomicity matters.
pub fn apply_operation(doc: &mut Value, op: &Operation) -> Result<()> {
    match op {
        Operation::Add { path, value } => pointer::set(doc, path, value.clone()),
        Operation::Remove { path } => pointer::remove(doc, path).map(drop),
        Operation::Replace { path, value } => pointer::replace(doc, path, value.clone()).map(drop),
        Operation::Move { from, path } => {
            if from == path {
                return pointer::get(doc, from).map(drop);
            }
            if path.starts_with(from) {
                return Err(Error::invalid_pointer(
                    path,
                    format!("cannot move '{}' into itself", from),
                ));
            }
            let value = pointer::get(doc, from)?.clone();
            pointer::remove(doc, from)?;
            pointer::set(doc, path, value)
        }
        Operation::Copy { from, path } => {
            let value = pointer::get(doc, from)?.clone();
            pointer::set(doc, path, value)
        }
        // A path that does not resolve fails the test like a differing value.
        Operation::Test { path, value } => match pointer::get(doc, path) {
            Ok(found) if found == value => Ok(()),
            _ => Err(Error::TestFailed {
                pointer: path.to_string(),
            }),
        },
    }
}

/// Byte-level convenience: parse both inputs, apply, and re-serialize.
pub fn apply_json(doc: &[u8], patch: &[u8]) -> Result<Vec<u8>> {
    let doc = document::parse_document(doc)?;
    let patch = Patch::from_slice(patch)?;
    let patched = apply(&doc, &patch)?;
    document::to_json_string(&patched).map(String::into_bytes)
}
