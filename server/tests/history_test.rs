//! Integration tests for the history protocol.
//!
//! These exercise the wire formats and the engine calls the server makes,
//! without a running PostgreSQL database.

use modelhub_engine::{
    apply, invert, reconstruct, Commit, CommitLog, Error, Patch, Replay, ReplayStep,
};
use serde_json::{json, Value};

/// Test helper to build a chain of commits from a list of patches.
fn build_history(base: Value, patches: Vec<Value>) -> (Value, Vec<Commit>, Vec<Value>) {
    let mut doc = base.clone();
    let mut versions = vec![base];
    let mut commits: Vec<Commit> = Vec::new();

    for (i, p) in patches.into_iter().enumerate() {
        let patch = Patch::from_value(p).unwrap();
        doc = apply(&doc, &patch).unwrap();
        versions.push(doc.clone());

        let id = format!("00000000-0000-0000-0000-{:012}", i + 1);
        let timestamp = 1706745600000 + i as u64 * 1000;
        let commit = match commits.last() {
            None => Commit::root(id, "model-1", "alice", patch, timestamp),
            Some(parent) => Commit::child_of(parent, id, "alice", patch, timestamp),
        };
        commits.push(commit);
    }
    (doc, commits, versions)
}

fn sample_history() -> (Value, Vec<Commit>, Vec<Value>) {
    build_history(
        json!({"name": "pump", "parts": []}),
        vec![
            json!([{"op": "add", "path": "/parts/-", "value": {"id": "valve"}}]),
            json!([
                {"op": "add", "path": "/parts/-", "value": {"id": "seal"}},
                {"op": "test", "path": "/name", "value": "pump"},
                {"op": "replace", "path": "/name", "value": "pump v2"}
            ]),
            json!([
                {"op": "test", "path": "/parts/0", "value": {"id": "valve"}},
                {"op": "remove", "path": "/parts/0"}
            ]),
        ],
    )
}

#[cfg(test)]
mod protocol_tests {
    use super::*;

    #[test]
    fn test_commit_request_deserialization() {
        let json = r#"{
            "authorId": "alice",
            "patch": [
                {"op": "test", "path": "/name", "value": "pump"},
                {"op": "replace", "path": "/name", "value": "pump v2"}
            ]
        }"#;

        #[derive(serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct CreateCommitRequest {
            author_id: String,
            patch: Patch,
        }

        let request: CreateCommitRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.author_id, "alice");
        assert_eq!(request.patch.len(), 2);
        assert_eq!(request.patch.operations()[1].name(), "replace");
    }

    #[test]
    fn test_commit_response_serialization() {
        let (_, commits, _) = sample_history();
        let json = serde_json::to_value(&commits[1]).unwrap();

        assert_eq!(json["parentCommitId"], "00000000-0000-0000-0000-000000000001");
        assert_eq!(json["modelId"], "model-1");
        assert_eq!(json["authorId"], "alice");
        assert_eq!(json["version"], 2);
        assert_eq!(json["createdAt"], 1706745601000u64);
        assert_eq!(json["patch"][0]["op"], "add");
        assert_eq!(json["patch"][0]["path"], "/parts/-");
    }

    #[test]
    fn test_stored_patch_ignores_operation_member_order() {
        let stored: Value = serde_json::from_str(
            r#"[{"value": {"id": "seal"}, "path": "/parts/-", "op": "add"}]"#,
        )
        .unwrap();
        let patch = Patch::from_value(stored).unwrap();
        assert_eq!(patch.operations()[0].path().to_string(), "/parts/-");
    }

    #[test]
    fn test_every_version_rebuilds() {
        let (latest_doc, commits, versions) = sample_history();
        let latest = commits.last().cloned();
        let log: CommitLog = commits.into_iter().collect();

        for (version, expected) in versions.iter().enumerate() {
            let doc =
                reconstruct(version as i64, latest_doc.clone(), latest.clone(), &log).unwrap();
            assert_eq!(&doc, expected, "version {}", version);
        }
    }

    #[test]
    fn test_replay_requests_one_commit_per_step() {
        let (latest_doc, commits, versions) = sample_history();
        let log: CommitLog = commits.iter().cloned().collect();

        let mut replay = Replay::start(0, latest_doc, commits.last().cloned()).unwrap();
        let mut requested = Vec::new();
        while let ReplayStep::NeedCommit(id) = replay.advance().unwrap() {
            requested.push(id.clone());
            replay.supply(log.get(&id).unwrap().clone()).unwrap();
        }

        assert_eq!(requested, vec![commits[1].id.clone(), commits[0].id.clone()]);
        assert_eq!(replay.into_document(), versions[0]);
    }

    #[test]
    fn test_future_version_is_a_conflict() {
        let (latest_doc, commits, _) = sample_history();
        let err = Replay::start(4, latest_doc, commits.last().cloned()).unwrap_err();
        assert_eq!(
            err,
            Error::VersionConflict {
                requested: 4,
                latest: 3
            }
        );
    }

    #[test]
    fn test_commit_validation_flow() {
        // The server applies, inverts and re-applies before storing.
        let current = json!({"name": "pump", "parts": [{"id": "valve"}]});
        let patch = Patch::from_value(json!([
            {"op": "test", "path": "/parts/0", "value": {"id": "valve"}},
            {"op": "remove", "path": "/parts/0"},
            {"op": "add", "path": "/parts/-", "value": {"id": "seal"}}
        ]))
        .unwrap();

        let next = apply(&current, &patch).unwrap();
        let inverse = invert(&patch, &next).unwrap();
        assert_eq!(apply(&next, &inverse).unwrap(), current);
    }

    #[test]
    fn test_rebuilt_version_keeps_member_order() {
        // Patch and snapshot as they come back from their JSON columns.
        let base_text = r#"{"name":"pump","config":{"zeta":1,"alpha":2}}"#;
        let patch_text = r#"[
            {"op":"test","path":"/config","value":{"zeta":1,"alpha":2}},
            {"op":"remove","path":"/config"}
        ]"#;
        let base: Value = serde_json::from_str(base_text).unwrap();
        let patch = Patch::from_json(patch_text).unwrap();
        let latest_doc = apply(&base, &patch).unwrap();

        let commit = Commit::root("c1", "model-1", "alice", patch, 1);
        let rebuilt = reconstruct(0, latest_doc, Some(commit), &CommitLog::new()).unwrap();
        assert_eq!(serde_json::to_string(&rebuilt).unwrap(), base_text);
    }
}
