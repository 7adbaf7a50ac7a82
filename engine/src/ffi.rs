//! FFI layer for non-Rust hosts.
//!
//! This module provides C-compatible functions over the patch and replay
//! engine. All data crosses the boundary as JSON strings.
//!
//! # Memory Management
//!
//! - Strings returned by `modelhub_*` functions are allocated by Rust
//! - Caller must free them with `modelhub_string_free`
//!
//! # Error Handling
//!
//! Functions return JSON with either:
//! - `{"ok": <result>}` on success
//! - `{"error": "<message>"}` on failure

use crate::{document, invert, patch, replay, Commit, CommitLog, Patch};
use std::ffi::{c_char, CStr, CString};

/// Result wrapper for FFI responses.
#[derive(serde::Serialize)]
#[serde(untagged)]
enum FfiResult<T: serde::Serialize> {
    Ok { ok: T },
    Err { error: String },
}

impl<T: serde::Serialize> FfiResult<T> {
    fn ok(value: T) -> Self {
        FfiResult::Ok { ok: value }
    }

    fn err(message: impl Into<String>) -> Self {
        FfiResult::Err {
            error: message.into(),
        }
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization failed: {}"}}"#, e))
    }
}

impl<T: serde::Serialize> From<crate::error::Result<T>> for FfiResult<T> {
    fn from(result: crate::error::Result<T>) -> Self {
        match result {
            Ok(value) => FfiResult::ok(value),
            Err(e) => FfiResult::err(e.to_string()),
        }
    }
}

/// Convert a Rust string to a C string pointer.
/// Caller must free with `modelhub_string_free`.
fn to_c_string(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        Err(_) => CString::from(c"{\"error\":\"string contained null bytes\"}").into_raw(),
    }
}

/// Convert a C string pointer to a Rust string.
/// Returns None if pointer is null or invalid UTF-8.
unsafe fn from_c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

fn error_json(message: impl Into<String>) -> *mut c_char {
    to_c_string(FfiResult::<()>::err(message).to_json())
}

/// Free a string allocated by the engine.
///
/// # Safety
/// - `s` must be a valid pointer from a `modelhub_*` function
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn modelhub_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

// ============================================================================
// Patches
// ============================================================================

/// Apply a patch to a document.
///
/// # Arguments
/// - `document_json`: the document
/// - `patch_json`: JSON array of operations
///
/// # Returns
/// JSON string: `{"ok": <patched document>}` or `{"error": "message"}`
///
/// # Safety
/// - Both arguments must be valid null-terminated C strings or null
/// - Caller must free the returned string with `modelhub_string_free`
#[no_mangle]
pub unsafe extern "C" fn modelhub_apply_patch(
    document_json: *const c_char,
    patch_json: *const c_char,
) -> *mut c_char {
    let Some(doc_str) = from_c_string(document_json) else {
        return error_json("invalid document string");
    };
    let Some(patch_str) = from_c_string(patch_json) else {
        return error_json("invalid patch string");
    };

    let result = document::parse_document(doc_str.as_bytes()).and_then(|doc| {
        let patch = Patch::from_json(&patch_str)?;
        patch::apply(&doc, &patch)
    });
    to_c_string(FfiResult::from(result).to_json())
}

/// Compute the inverse of a patch.
///
/// # Arguments
/// - `patch_json`: JSON array of operations
/// - `target_json`: the document the patch produced
///
/// # Returns
/// JSON string: `{"ok": <inverse patch>}` or `{"error": "message"}`
///
/// # Safety
/// - Both arguments must be valid null-terminated C strings or null
/// - Caller must free the returned string with `modelhub_string_free`
#[no_mangle]
pub unsafe extern "C" fn modelhub_invert_patch(
    patch_json: *const c_char,
    target_json: *const c_char,
) -> *mut c_char {
    let Some(patch_str) = from_c_string(patch_json) else {
        return error_json("invalid patch string");
    };
    let Some(target_str) = from_c_string(target_json) else {
        return error_json("invalid document string");
    };

    let result = document::parse_document(target_str.as_bytes()).and_then(|target| {
        let patch = Patch::from_json(&patch_str)?;
        invert::invert(&patch, &target)
    });
    to_c_string(FfiResult::from(result).to_json())
}

// ============================================================================
// Replay
// ============================================================================

/// Reconstruct a historical version of a model.
///
/// # Arguments
/// - `target_version`: version to rebuild
/// - `snapshot_json`: the latest stored document
/// - `latest_commit_id`: ID of the newest commit, or null when there are none
/// - `commits_json`: JSON array of the model's commits
///
/// # Returns
/// JSON string: `{"ok": <document>}` or `{"error": "message"}`
///
/// # Safety
/// - String arguments must be valid null-terminated C strings or null
/// - Caller must free the returned string with `modelhub_string_free`
#[no_mangle]
pub unsafe extern "C" fn modelhub_reconstruct(
    target_version: i64,
    snapshot_json: *const c_char,
    latest_commit_id: *const c_char,
    commits_json: *const c_char,
) -> *mut c_char {
    let Some(snapshot_str) = from_c_string(snapshot_json) else {
        return error_json("invalid snapshot string");
    };
    let Some(commits_str) = from_c_string(commits_json) else {
        return error_json("invalid commits string");
    };
    let latest_id = from_c_string(latest_commit_id);

    let commits: Vec<Commit> = match serde_json::from_str(&commits_str) {
        Ok(c) => c,
        Err(e) => return error_json(format!("parse error: {}", e)),
    };
    let log: CommitLog = commits.into_iter().collect();

    let latest = match latest_id {
        Some(id) => match log.get(&id) {
            Some(commit) => Some(commit.clone()),
            None => return error_json(format!("latest commit {} not in commit list", id)),
        },
        None => None,
    };

    let result = document::parse_document(snapshot_str.as_bytes())
        .and_then(|snapshot| replay::reconstruct(target_version, snapshot, latest, &log));
    to_c_string(FfiResult::from(result).to_json())
}

// ============================================================================
// Utility
// ============================================================================

/// Get the engine version.
///
/// # Returns
/// Static string pointer (do not free)
#[no_mangle]
pub extern "C" fn modelhub_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
