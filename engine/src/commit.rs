//! Commits and commit lookup.
//!
//! Commits for one model form a singly linked list through
//! `parent_commit_id`. A commit's `version` is its 1-based distance from the
//! root commit, and its patch turns the document before it into the document
//! after it.

use crate::{error::Result, AuthorId, CommitId, Error, ModelId, Patch, Timestamp, Version};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// A recorded change to one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    /// Commit ID
    pub id: CommitId,
    /// Previous commit, `None` for the root (an empty string on the wire also means root)
    #[serde(default, deserialize_with = "empty_as_none")]
    pub parent_commit_id: Option<CommitId>,
    /// Forward patch, computed as an invertible diff
    pub patch: Patch,
    /// Model the commit belongs to
    pub model_id: ModelId,
    /// Author of the change
    pub author_id: AuthorId,
    /// Distance from the root, starting at 1
    pub version: Version,
    /// Creation time in milliseconds
    pub created_at: Timestamp,
}

fn empty_as_none<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<CommitId>, D::Error> {
    let id = Option::<String>::deserialize(deserializer)?;
    Ok(id.filter(|s| !s.is_empty()))
}

impl Commit {
    /// Create the first commit of a model.
    pub fn root(
        id: impl Into<CommitId>,
        model_id: impl Into<ModelId>,
        author_id: impl Into<AuthorId>,
        patch: Patch,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            parent_commit_id: None,
            patch,
            model_id: model_id.into(),
            author_id: author_id.into(),
            version: 1,
            created_at,
        }
    }

    /// Create the commit that follows `parent`.
    pub fn child_of(
        parent: &Commit,
        id: impl Into<CommitId>,
        author_id: impl Into<AuthorId>,
        patch: Patch,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            parent_commit_id: Some(parent.id.clone()),
            patch,
            model_id: parent.model_id.clone(),
            author_id: author_id.into(),
            version: parent.version + 1,
            created_at,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_commit_id.is_none()
    }
}

/// Lookup of commits by ID.
///
/// Implementations may block; the replayer calls this once per step.
pub trait CommitSource {
    fn commit_by_id(&self, id: &str) -> Result<Commit>;
}

/// An in-memory commit store.
#[derive(Debug, Clone, Default)]
pub struct CommitLog {
    commits: HashMap<CommitId, Commit>,
}

impl CommitLog {
    pub fn new() -> Self {
        Self {
            commits: HashMap::new(),
        }
    }

    /// Insert a commit, replacing any commit with the same ID.
    pub fn insert(&mut self, commit: Commit) {
        self.commits.insert(commit.id.clone(), commit);
    }

    pub fn get(&self, id: &str) -> Option<&Commit> {
        self.commits.get(id)
    }

    /// The highest-version commit of a model.
    pub fn latest_for(&self, model_id: &str) -> Option<&Commit> {
        self.commits
            .values()
            .filter(|c| c.model_id == model_id)
            .max_by_key(|c| c.version)
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }
}

impl FromIterator<Commit> for CommitLog {
    fn from_iter<I: IntoIterator<Item = Commit>>(iter: I) -> Self {
        let mut log = Self::new();
        for commit in iter {
            log.insert(commit);
        }
        log
    }
}

impl CommitSource for CommitLog {
    fn commit_by_id(&self, id: &str) -> Result<Commit> {
        self.get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("commit {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn child_links_to_parent() {
        let root = Commit::root("c1", "model-1", "alice", Patch::new(), 1000);
        let child = Commit::child_of(&root, "c2", "bob", Patch::new(), 2000);

        assert!(root.is_root());
        assert_eq!(root.version, 1);
        assert_eq!(child.parent_commit_id.as_deref(), Some("c1"));
        assert_eq!(child.model_id, "model-1");
        assert_eq!(child.version, 2);
        assert!(!child.is_root());
    }

    #[test]
    fn empty_parent_on_wire_means_root() {
        let commit: Commit = serde_json::from_value(json!({
            "id": "c1",
            "parentCommitId": "",
            "patch": [{"op": "add", "path": "/a", "value": 1}],
            "modelId": "m",
            "authorId": "u",
            "version": 1,
            "createdAt": 0
        }))
        .unwrap();
        assert!(commit.is_root());
        assert_eq!(commit.patch.len(), 1);

        let missing: Commit = serde_json::from_value(json!({
            "id": "c1",
            "patch": [],
            "modelId": "m",
            "authorId": "u",
            "version": 1,
            "createdAt": 0
        }))
        .unwrap();
        assert!(missing.is_root());
    }

    #[test]
    fn serialization_is_camel_case() {
        let root = Commit::root("c1", "m", "u", Patch::new(), 5);
        let json = serde_json::to_string(&root).unwrap();
        assert!(json.contains("\"parentCommitId\":null"));
        assert!(json.contains("\"createdAt\":5"));

        let parsed: Commit = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, root);
    }

    #[test]
    fn log_lookup_and_latest() {
        let c1 = Commit::root("c1", "m", "u", Patch::new(), 1);
        let c2 = Commit::child_of(&c1, "c2", "u", Patch::new(), 2);
        let other = Commit::root("x1", "other", "u", Patch::new(), 3);
        let log: CommitLog = vec![c1.clone(), c2.clone(), other].into_iter().collect();

        assert_eq!(log.len(), 3);
        assert_eq!(log.latest_for("m"), Some(&c2));
        assert_eq!(log.latest_for("nobody"), None);
        assert_eq!(log.commit_by_id("c1").unwrap(), c1);
        assert!(matches!(log.commit_by_id("zz"), Err(Error::NotFound(_))));
    }
}
