//! Patch inversion.
//!
//! Inverting a patch needs the document the patch produced. Operations are
//! undone from last to first while a reconstruction cursor, starting at that
//! document, receives every emitted inverse operation. Array lengths and
//! append positions are always read from the cursor, never from a frozen
//! snapshot: with two mutations on the same array, the second one undone must
//! see the array as the first undo left it.
//!
//! The inverse is itself invertible: every `remove` and `replace` it emits is
//! preceded by a `test` carrying the value being taken away.

use crate::{
    document,
    error::Result,
    patch::{apply, apply_operation},
    pointer::{self, parse_index, APPEND_TOKEN},
    Error, Operation, Patch, Pointer,
};
use serde_json::Value;

/// Compute the inverse of `patch`.
///
/// `target` is the document `patch` produced, which is also the document the
/// returned inverse applies to. Fails with [`Error::MissingTestOperation`]
/// when a `remove` or `replace` is not preceded by its paired `test`, and
/// with [`Error::UnsupportedOperation`] on `move` or `copy`.
pub fn invert(patch: &Patch, target: &Value) -> Result<Patch> {
    let ops = patch.operations();
    let mut cursor = target.clone();
    let mut inverse = Vec::with_capacity(ops.len());

    for index in (0..ops.len()).rev() {
        let undo = invert_operation(ops, index, &cursor)?;
        for op in &undo {
            apply_operation(&mut cursor, op).map_err(|e| Error::OperationFailed {
                index,
                source: Box::new(e),
            })?;
        }
        inverse.extend(undo);
    }

    Ok(Patch::from(inverse))
}

/// Invert `patch` given the document it was applied to.
pub fn invert_from_base(patch: &Patch, base: &Value) -> Result<Patch> {
    let target = apply(base, patch)?;
    invert(patch, &target)
}

/// Undo `patch` on `target`, returning the document before the patch.
pub fn revert(patch: &Patch, target: &Value) -> Result<Value> {
    let inverse = invert(patch, target)?;
    apply(target, &inverse)
}

/// Byte-level form of [`invert`]: serialized patch and target in, serialized
/// inverse out.
pub fn invert_json(patch: &[u8], target: &[u8]) -> Result<Vec<u8>> {
    let patch = Patch::from_slice(patch)?;
    let target = document::parse_document(target)?;
    let inverse = invert(&patch, &target)?;
    inverse.to_json().map(String::into_bytes)
}

fn invert_operation(ops: &[Operation], index: usize, cursor: &Value) -> Result<Vec<Operation>> {
    match &ops[index] {
        // Consumed by the remove/replace that follows it.
        Operation::Test { .. } => Ok(Vec::new()),

        Operation::Add { path, value } => {
            let at = match appended_array(cursor, path) {
                Some((parent, len)) => {
                    // `-` cannot be removed; the appended element is now last.
                    let last = len
                        .checked_sub(1)
                        .ok_or_else(|| Error::NotFound(path.to_string()))?;
                    parent.child(last.to_string())
                }
                None => path.clone(),
            };
            Ok(vec![
                Operation::test(at.clone(), value.clone()),
                Operation::remove(at),
            ])
        }

        Operation::Remove { path } => {
            let removed = paired_test(ops, index, path)?.clone();
            let at = match removed_tail(cursor, path) {
                Some(parent) => parent.child(APPEND_TOKEN),
                None => path.clone(),
            };
            Ok(vec![Operation::add(at, removed)])
        }

        Operation::Replace { path, value } => {
            let prior = paired_test(ops, index, path)?.clone();
            Ok(vec![
                Operation::test(path.clone(), value.clone()),
                Operation::replace(path.clone(), prior),
            ])
        }

        op @ (Operation::Move { .. } | Operation::Copy { .. }) => Err(
            Error::UnsupportedOperation(format!("cannot invert {} at index {}", op.name(), index)),
        ),
    }
}

/// The `test` immediately before `index`, which must target `path`.
fn paired_test<'a>(ops: &'a [Operation], index: usize, path: &Pointer) -> Result<&'a Value> {
    let previous = index.checked_sub(1).and_then(|i| ops.get(i));
    match previous {
        Some(Operation::Test { path: tested, value }) if tested == path => Ok(value),
        _ => Err(Error::MissingTestOperation {
            op: ops[index].name().to_string(),
            index,
        }),
    }
}

/// For an append (`.../-`) onto an array, the array pointer and its current
/// length in the cursor.
fn appended_array(cursor: &Value, path: &Pointer) -> Option<(Pointer, usize)> {
    if !path.is_append() {
        return None;
    }
    let parent = path.parent()?;
    let len = pointer::array_len(cursor, &parent).ok()?;
    Some((parent, len))
}

/// For a removal that took the last element of an array, the array pointer.
///
/// The cursor holds the array after the removal, so the removed element was
/// last exactly when its index equals the current length.
fn removed_tail(cursor: &Value, path: &Pointer) -> Option<Pointer> {
    let index = parse_index(path.last()?)?;
    let parent = path.parent()?;
    let len = pointer::array_len(cursor, &parent).ok()?;
    (index == len).then_some(parent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patch(value: Value) -> Patch {
        Patch::from_value(value).unwrap()
    }

    fn roundtrip(base: Value, p: Value) -> Patch {
        let p = patch(p);
        let target = apply(&base, &p).unwrap();
        let inverse = invert(&p, &target).unwrap();
        assert_eq!(apply(&target, &inverse).unwrap(), base);
        inverse
    }

    #[test]
    fn append_inverts_to_removing_last_index() {
        let inverse = roundtrip(
            json!({"arr": [1, 2]}),
            json!([{"op": "add", "path": "/arr/-", "value": "x"}]),
        );
        assert_eq!(
            inverse,
            patch(json!([
                {"op": "test", "path": "/arr/2", "value": "x"},
                {"op": "remove", "path": "/arr/2"}
            ]))
        );
    }

    #[test]
    fn two_removals_from_same_array() {
        let base = json!({"arr": [1, 2]});
        let p = patch(json!([
            {"op": "test", "path": "/arr/1", "value": 2},
            {"op": "remove", "path": "/arr/1"},
            {"op": "test", "path": "/arr/0", "value": 1},
            {"op": "remove", "path": "/arr/0"}
        ]));
        let target = apply(&base, &p).unwrap();
        assert_eq!(target, json!({"arr": []}));

        let inverse = invert(&p, &target).unwrap();
        assert_eq!(
            inverse,
            patch(json!([
                {"op": "add", "path": "/arr/-", "value": 1},
                {"op": "add", "path": "/arr/-", "value": 2}
            ]))
        );
        assert_eq!(apply(&target, &inverse).unwrap(), json!({"arr": [1, 2]}));
    }

    #[test]
    fn multiple_appends_to_same_array() {
        roundtrip(
            json!({"arr": ["a"]}),
            json!([
                {"op": "add", "path": "/arr/-", "value": "b"},
                {"op": "add", "path": "/arr/-", "value": "c"},
                {"op": "add", "path": "/arr/0", "value": "z"}
            ]),
        );
    }

    #[test]
    fn removal_from_middle_stays_positional() {
        let inverse = roundtrip(
            json!({"arr": [1, 2, 3]}),
            json!([
                {"op": "test", "path": "/arr/1", "value": 2},
                {"op": "remove", "path": "/arr/1"}
            ]),
        );
        assert_eq!(
            inverse,
            patch(json!([{"op": "add", "path": "/arr/1", "value": 2}]))
        );
    }

    #[test]
    fn removal_of_last_element_becomes_append() {
        let inverse = roundtrip(
            json!({"arr": [1, 2, 3]}),
            json!([
                {"op": "test", "path": "/arr/2", "value": 3},
                {"op": "remove", "path": "/arr/2"}
            ]),
        );
        assert_eq!(
            inverse,
            patch(json!([{"op": "add", "path": "/arr/-", "value": 3}]))
        );
    }

    #[test]
    fn replace_and_object_members() {
        let inverse = roundtrip(
            json!({"meta": {"name": "old", "draft": true}}),
            json!([
                {"op": "test", "path": "/meta/name", "value": "old"},
                {"op": "replace", "path": "/meta/name", "value": "new"},
                {"op": "test", "path": "/meta/draft", "value": true},
                {"op": "remove", "path": "/meta/draft"},
                {"op": "add", "path": "/meta/summary", "value": "s"}
            ]),
        );
        assert_eq!(
            inverse,
            patch(json!([
                {"op": "test", "path": "/meta/summary", "value": "s"},
                {"op": "remove", "path": "/meta/summary"},
                {"op": "add", "path": "/meta/draft", "value": true},
                {"op": "test", "path": "/meta/name", "value": "new"},
                {"op": "replace", "path": "/meta/name", "value": "old"}
            ]))
        );
    }

    #[test]
    fn numeric_object_keys_are_not_indices() {
        roundtrip(
            json!({"byId": {"0": "a", "1": "b"}}),
            json!([
                {"op": "test", "path": "/byId/1", "value": "b"},
                {"op": "remove", "path": "/byId/1"}
            ]),
        );
        roundtrip(
            json!({"obj": {}}),
            json!([{"op": "add", "path": "/obj/-", "value": 1}]),
        );
    }

    #[test]
    fn inverse_is_reinvertible() {
        let base = json!({"arr": [1, 2], "k": "v"});
        let p = patch(json!([
            {"op": "test", "path": "/arr/1", "value": 2},
            {"op": "remove", "path": "/arr/1"},
            {"op": "test", "path": "/arr/0", "value": 1},
            {"op": "remove", "path": "/arr/0"},
            {"op": "test", "path": "/k", "value": "v"},
            {"op": "replace", "path": "/k", "value": "w"}
        ]));
        let target = apply(&base, &p).unwrap();
        let inverse = invert(&p, &target).unwrap();
        let again = invert(&inverse, &base).unwrap();

        assert_eq!(again, p);
        assert_eq!(apply(&base, &again).unwrap(), target);
    }

    #[test]
    fn remove_without_test_fails() {
        let p = patch(json!([{"op": "remove", "path": "/a"}]));
        let err = invert(&p, &json!({})).unwrap_err();
        assert_eq!(
            err,
            Error::MissingTestOperation {
                op: "remove".into(),
                index: 0
            }
        );
    }

    #[test]
    fn test_for_other_path_does_not_pair() {
        let p = patch(json!([
            {"op": "test", "path": "/b", "value": 1},
            {"op": "replace", "path": "/a", "value": 2}
        ]));
        let err = invert(&p, &json!({"a": 2, "b": 1})).unwrap_err();
        assert!(matches!(err, Error::MissingTestOperation { index: 1, .. }));
    }

    #[test]
    fn move_and_copy_are_unsupported() {
        for op in ["move", "copy"] {
            let p = patch(json!([
                {"op": "add", "path": "/x", "value": 1},
                {"op": op, "from": "/a", "path": "/b"}
            ]));
            let err = invert(&p, &json!({"a": 1, "b": 1, "x": 1})).unwrap_err();
            assert!(matches!(err, Error::UnsupportedOperation(_)), "{op}");
        }
    }

    #[test]
    fn diverged_target_is_detected() {
        let p = patch(json!([{"op": "add", "path": "/a", "value": 1}]));
        let err = invert(&p, &json!({"a": 2})).unwrap_err();
        assert_eq!(
            err.root_cause(),
            &Error::TestFailed {
                pointer: "/a".into()
            }
        );
    }

    #[test]
    fn from_base_and_revert() {
        let base = json!({"arr": [1, 2]});
        let p = patch(json!([{"op": "add", "path": "/arr/-", "value": "x"}]));

        let inverse = invert_from_base(&p, &base).unwrap();
        let target = apply(&base, &p).unwrap();
        assert_eq!(apply(&target, &inverse).unwrap(), base);
        assert_eq!(revert(&p, &target).unwrap(), base);
    }

    #[test]
    fn invert_json_bytes() {
        let out = invert_json(
            br#"[{"op":"add","path":"/arr/-","value":"x"}]"#,
            br#"{"arr":[1,2,"x"]}"#,
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"[{"op":"test","path":"/arr/2","value":"x"},{"op":"remove","path":"/arr/2"}]"#
        );
    }

    // Property-based tests using proptest
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Edit {
            Append(i64),
            Insert(usize, i64),
            Remove(usize),
            Replace(usize, i64),
            SetField(u8, i64),
            DropField(u8),
        }

        fn arb_edit() -> impl Strategy<Value = Edit> {
            prop_oneof![
                any::<i64>().prop_map(Edit::Append),
                (0usize..8, any::<i64>()).prop_map(|(i, v)| Edit::Insert(i, v)),
                (0usize..8).prop_map(Edit::Remove),
                (0usize..8, any::<i64>()).prop_map(|(i, v)| Edit::Replace(i, v)),
                (0u8..3, any::<i64>()).prop_map(|(k, v)| Edit::SetField(k, v)),
                (0u8..3).prop_map(Edit::DropField),
            ]
        }

        /// Turn edits into an invertible patch, tracking the document so
        /// every remove and replace carries the value it takes away.
        fn build_patch(base: &Value, edits: &[Edit]) -> Patch {
            let mut doc = base.clone();
            let mut patch = Patch::new();
            let arr = Pointer::root().child("arr");
            let fields = Pointer::root().child("fields");

            for edit in edits {
                let len = pointer::array_len(&doc, &arr).unwrap();
                let ops = match edit {
                    Edit::Append(v) => vec![Operation::add(arr.child(APPEND_TOKEN), json!(v))],
                    Edit::Insert(i, v) => {
                        vec![Operation::add(arr.child((i % (len + 1)).to_string()), json!(v))]
                    }
                    Edit::Remove(_) | Edit::Replace(..) if len == 0 => continue,
                    Edit::Remove(i) => {
                        let at = arr.child((i % len).to_string());
                        let old = pointer::get(&doc, &at).unwrap().clone();
                        vec![Operation::test(at.clone(), old), Operation::remove(at)]
                    }
                    Edit::Replace(i, v) => {
                        let at = arr.child((i % len).to_string());
                        let old = pointer::get(&doc, &at).unwrap().clone();
                        vec![
                            Operation::test(at.clone(), old),
                            Operation::replace(at, json!(v)),
                        ]
                    }
                    Edit::SetField(k, v) => {
                        let at = fields.child(format!("f{k}"));
                        match pointer::get(&doc, &at) {
                            Ok(old) => vec![
                                Operation::test(at.clone(), old.clone()),
                                Operation::replace(at, json!(v)),
                            ],
                            Err(_) => vec![Operation::add(at, json!(v))],
                        }
                    }
                    Edit::DropField(k) => {
                        let at = fields.child(format!("f{k}"));
                        match pointer::get(&doc, &at) {
                            Ok(old) => {
                                vec![Operation::test(at.clone(), old.clone()), Operation::remove(at)]
                            }
                            Err(_) => continue,
                        }
                    }
                };
                for op in ops {
                    apply_operation(&mut doc, &op).unwrap();
                    patch.push(op);
                }
            }
            patch
        }

        proptest! {
            #[test]
            fn prop_inverse_restores_base(
                items in prop::collection::vec(any::<i64>(), 0..6),
                edits in prop::collection::vec(arb_edit(), 0..12),
            ) {
                let base = json!({"arr": items, "fields": {}});
                let p = build_patch(&base, &edits);

                let target = apply(&base, &p).unwrap();
                let inverse = invert(&p, &target).unwrap();
                let restored = apply(&target, &inverse).unwrap();

                prop_assert_eq!(
                    document::to_canonical_string(&restored).unwrap(),
                    document::to_canonical_string(&base).unwrap()
                );
            }

            #[test]
            fn prop_inverse_is_reinvertible(
                items in prop::collection::vec(any::<i64>(), 0..6),
                edits in prop::collection::vec(arb_edit(), 0..12),
            ) {
                let base = json!({"arr": items, "fields": {}});
                let p = build_patch(&base, &edits);

                let target = apply(&base, &p).unwrap();
                let inverse = invert(&p, &target).unwrap();
                let again = invert(&inverse, &base).unwrap();

                prop_assert_eq!(apply(&base, &again).unwrap(), target);
            }
        }
    }
}
