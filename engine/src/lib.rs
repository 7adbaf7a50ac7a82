//! # Model Hub Engine
//!
//! Version control for JSON documents.
//!
//! Every change to a model is recorded as a commit carrying a JSON Patch
//! (RFC 6902). Only the latest document is stored; any earlier version is
//! rebuilt by walking the commit chain backwards and undoing each patch.
//!
//! ## Design Principles
//!
//! - **No IO**: commit lookups are supplied by the caller
//! - **Deterministic**: the same snapshot and commits always rebuild the same document
//! - **Copy-on-write**: a failed patch never leaves a half-modified document behind
//!
//! ## Core Concepts
//!
//! ### Pointers
//!
//! A [`Pointer`] (RFC 6901) addresses a location in a document. The
//! [`pointer`] module resolves, inserts, removes and replaces values.
//!
//! ### Patches
//!
//! A [`Patch`] is an ordered list of [`Operation`]s, applied with [`apply`].
//! Patches meant for storage are *invertible*: every `remove` and `replace`
//! is immediately preceded by a `test` holding the value it takes away.
//!
//! ### Inversion
//!
//! [`invert`] turns a patch into its undo, given the document it produced.
//! Appends and tail removals are resolved against a live reconstruction
//! cursor, so several edits to the same array undo correctly.
//!
//! ### Replay
//!
//! [`Replay`] is a step-wise state machine that undoes commits from the
//! latest snapshot down to a target version, requesting each parent commit
//! from the caller. [`reconstruct`] drives it over any [`CommitSource`].
//!
//! ## Quick Start
//!
//! ```rust
//! use modelhub_engine::{apply, invert, reconstruct, Commit, CommitLog, Patch};
//! use serde_json::json;
//!
//! let v0 = json!({"tags": []});
//! let patch = Patch::from_value(json!([
//!     {"op": "add", "path": "/tags/-", "value": "draft"},
//!     {"op": "add", "path": "/title", "value": "Pump model"}
//! ]))
//! .unwrap();
//!
//! // 1. Apply a patch
//! let v1 = apply(&v0, &patch).unwrap();
//! assert_eq!(v1, json!({"tags": ["draft"], "title": "Pump model"}));
//!
//! // 2. Undo it
//! let inverse = invert(&patch, &v1).unwrap();
//! assert_eq!(apply(&v1, &inverse).unwrap(), v0);
//!
//! // 3. Rebuild a version from the commit chain
//! let commit = Commit::root("c1", "model-1", "alice", patch, 1706745600000);
//! let log: CommitLog = vec![commit.clone()].into_iter().collect();
//! let rebuilt = reconstruct(0, v1, Some(commit), &log).unwrap();
//! assert_eq!(rebuilt, v0);
//! ```
//!
//! ## FFI
//!
//! The [`ffi`] module provides C-compatible functions for use from other
//! languages. All data is exchanged as JSON strings.

pub mod commit;
pub mod document;
pub mod error;
pub mod ffi;
pub mod invert;
pub mod operation;
pub mod patch;
pub mod pointer;
pub mod replay;

// Re-export main types at crate root
pub use commit::{Commit, CommitLog, CommitSource};
pub use error::Error;
pub use invert::{invert, invert_from_base, revert};
pub use operation::Operation;
pub use patch::{apply, apply_operation, Patch};
pub use pointer::Pointer;
pub use replay::{reconstruct, Replay, ReplayState, ReplayStep};

/// Engine crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Type aliases for clarity
pub type CommitId = String;
pub type ModelId = String;
pub type AuthorId = String;
pub type Version = u64;
pub type Timestamp = u64;
