//! Error types for the model hub engine.

use crate::{CommitId, Version};
use thiserror::Error;

/// All possible errors from the engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Resolution errors
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid pointer '{pointer}': {reason}")]
    InvalidPointer { pointer: String, reason: String },

    #[error("type mismatch at '{pointer}': expected {expected}, got {got}")]
    TypeMismatch {
        pointer: String,
        expected: String,
        got: String,
    },

    // Patch errors
    #[error("test failed at '{pointer}'")]
    TestFailed { pointer: String },

    #[error("missing test operation before {op} at index {index}")]
    MissingTestOperation { op: String, index: usize },

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("invalid patch: {0}")]
    InvalidPatch(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("operation {index} failed: {source}")]
    OperationFailed {
        index: usize,
        #[source]
        source: Box<Error>,
    },

    // Replay errors
    #[error("version conflict: requested {requested}, latest is {latest}")]
    VersionConflict { requested: i64, latest: Version },

    #[error("invalid version: {0}")]
    InvalidVersion(i64),

    #[error("broken commit chain at {commit}: {reason}")]
    BrokenChain { commit: CommitId, reason: String },
}

impl Error {
    pub(crate) fn invalid_pointer(pointer: impl ToString, reason: impl Into<String>) -> Self {
        Error::InvalidPointer {
            pointer: pointer.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn broken_chain(commit: impl Into<CommitId>, reason: impl Into<String>) -> Self {
        Error::BrokenChain {
            commit: commit.into(),
            reason: reason.into(),
        }
    }

    /// The underlying error with any `OperationFailed` wrapping removed.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::OperationFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Index of the failing operation, if this error came out of a patch application.
    pub fn operation_index(&self) -> Option<usize> {
        match self {
            Error::OperationFailed { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
