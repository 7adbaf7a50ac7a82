//! Patch operation types.
//!
//! Operations follow RFC 6902 and serialize as `{"op": .., "path": .., ..}`
//! objects. Diff generators that emit *invertible* patches place a `test`
//! immediately before every `remove` and `replace`, recording the value that
//! is about to be overwritten.

use crate::Pointer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single JSON Patch operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Operation {
    Add { path: Pointer, value: Value },
    Remove { path: Pointer },
    Replace { path: Pointer, value: Value },
    Move { from: Pointer, path: Pointer },
    Copy { from: Pointer, path: Pointer },
    Test { path: Pointer, value: Value },
}

impl Operation {
    pub fn add(path: Pointer, value: Value) -> Self {
        Operation::Add { path, value }
    }

    pub fn remove(path: Pointer) -> Self {
        Operation::Remove { path }
    }

    pub fn replace(path: Pointer, value: Value) -> Self {
        Operation::Replace { path, value }
    }

    pub fn test(path: Pointer, value: Value) -> Self {
        Operation::Test { path, value }
    }

    /// The `op` name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Add { .. } => "add",
            Operation::Remove { .. } => "remove",
            Operation::Replace { .. } => "replace",
            Operation::Move { .. } => "move",
            Operation::Copy { .. } => "copy",
            Operation::Test { .. } => "test",
        }
    }

    /// Target pointer of the operation.
    pub fn path(&self) -> &Pointer {
        match self {
            Operation::Add { path, .. }
            | Operation::Remove { path }
            | Operation::Replace { path, .. }
            | Operation::Move { path, .. }
            | Operation::Copy { path, .. }
            | Operation::Test { path, .. } => path,
        }
    }

    /// Source pointer for `move` and `copy`.
    pub fn from(&self) -> Option<&Pointer> {
        match self {
            Operation::Move { from, .. } | Operation::Copy { from, .. } => Some(from),
            _ => None,
        }
    }

    /// Value carried by `add`, `replace` and `test`.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Operation::Add { value, .. }
            | Operation::Replace { value, .. }
            | Operation::Test { value, .. } => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ptr(s: &str) -> Pointer {
        Pointer::parse(s).unwrap()
    }

    #[test]
    fn accessors() {
        let op = Operation::replace(ptr("/meta/name"), json!("Loan model"));
        assert_eq!(op.name(), "replace");
        assert_eq!(op.path(), &ptr("/meta/name"));
        assert_eq!(op.value(), Some(&json!("Loan model")));
        assert_eq!(op.from(), None);

        let op = Operation::Move {
            from: ptr("/a"),
            path: ptr("/b"),
        };
        assert_eq!(op.name(), "move");
        assert_eq!(op.from(), Some(&ptr("/a")));
        assert_eq!(op.value(), None);
    }

    #[test]
    fn wire_format() {
        let op = Operation::add(ptr("/diagrams/-"), json!({"meta": {"uuid": "d1"}}));
        let json = serde_json::to_string(&op).unwrap();
        assert_eq!(
            json,
            r#"{"op":"add","path":"/diagrams/-","value":{"meta":{"uuid":"d1"}}}"#
        );

        let op = Operation::remove(ptr("/a~1b"));
        assert_eq!(
            serde_json::to_string(&op).unwrap(),
            r#"{"op":"remove","path":"/a~1b"}"#
        );
    }

    #[test]
    fn parse_all_kinds() {
        let ops: Vec<Operation> = serde_json::from_str(
            r#"[
                {"op": "add", "path": "/a", "value": 1},
                {"op": "test", "path": "/b", "value": null},
                {"op": "remove", "path": "/b"},
                {"op": "replace", "path": "/c", "value": [1]},
                {"op": "move", "from": "/d", "path": "/e"},
                {"op": "copy", "from": "/e", "path": "/f"}
            ]"#,
        )
        .unwrap();

        let names: Vec<_> = ops.iter().map(Operation::name).collect();
        assert_eq!(names, ["add", "test", "remove", "replace", "move", "copy"]);
        assert_eq!(ops[1], Operation::test(ptr("/b"), json!(null)));
    }

    #[test]
    fn parse_rejects_unknown_op_and_bad_pointer() {
        assert!(serde_json::from_str::<Operation>(r#"{"op":"flip","path":"/a"}"#).is_err());
        assert!(serde_json::from_str::<Operation>(r#"{"op":"remove","path":"a"}"#).is_err());
        assert!(serde_json::from_str::<Operation>(r#"{"op":"add","path":"/a"}"#).is_err());
    }
}
