//! Commit chain replay.
//!
//! Historical versions are rebuilt from the latest snapshot by undoing
//! commits one at a time, newest first. Each step needs the previous step's
//! output, so replay is strictly sequential.
//!
//! [`Replay`] is the replay state machine. It never performs lookups itself:
//! when it needs the next commit it says so with [`ReplayStep::NeedCommit`],
//! and the caller fetches that commit however it likes (a database query, an
//! in-memory map) and hands it back with [`Replay::supply`]. Callers that can
//! look commits up synchronously can use [`reconstruct`] instead.

use crate::{
    commit::CommitSource,
    error::Result,
    invert::invert,
    patch::apply,
    Commit, CommitId, Error, Version,
};
use serde_json::Value;

/// Where a replay currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    /// Undoing commits toward the target version.
    Walking,
    /// The document is at the target version.
    Done,
    /// A step failed; the replay cannot continue.
    Failed,
}

/// Outcome of [`Replay::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayStep {
    /// The commit with this ID must be supplied before the next step.
    NeedCommit(CommitId),
    /// The target version has been reached.
    Done,
}

/// Reconstruction of one historical version of a model.
#[derive(Debug, Clone)]
pub struct Replay {
    target: Version,
    version: Version,
    document: Value,
    state: ReplayState,
    /// Commit to undo on the next advance.
    pending: Option<Commit>,
    /// Parent requested from the caller.
    awaiting: Option<CommitId>,
    failure: Option<Error>,
}

impl Replay {
    /// Begin reconstructing `target` from the latest snapshot.
    ///
    /// `latest` is the newest commit of the model, or `None` when the model
    /// has never been changed (its latest version is then 0).
    pub fn start(target: i64, snapshot: Value, latest: Option<Commit>) -> Result<Self> {
        if target < 0 {
            return Err(Error::InvalidVersion(target));
        }
        let latest_version = latest.as_ref().map_or(0, |c| c.version);
        let target = target as Version;
        if target > latest_version {
            return Err(Error::VersionConflict {
                requested: target as i64,
                latest: latest_version,
            });
        }

        let state = if target == latest_version {
            ReplayState::Done
        } else {
            ReplayState::Walking
        };

        Ok(Self {
            target,
            version: latest_version,
            document: snapshot,
            state,
            pending: latest.filter(|_| state == ReplayState::Walking),
            awaiting: None,
            failure: None,
        })
    }

    pub fn state(&self) -> ReplayState {
        self.state
    }

    /// Version the current document corresponds to.
    pub fn version(&self) -> Version {
        self.version
    }

    pub fn target(&self) -> Version {
        self.target
    }

    /// The document at [`Replay::version`].
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Consume the replay, returning the document at [`Replay::version`].
    pub fn into_document(self) -> Value {
        self.document
    }

    /// Undo the next commit.
    ///
    /// Returns [`ReplayStep::NeedCommit`] while waiting for a parent commit;
    /// calling again before [`Replay::supply`] repeats the request.
    pub fn advance(&mut self) -> Result<ReplayStep> {
        match self.state {
            ReplayState::Done => return Ok(ReplayStep::Done),
            ReplayState::Failed => {
                return Err(self
                    .failure
                    .clone()
                    .unwrap_or_else(|| Error::broken_chain("", "replay failed")))
            }
            ReplayState::Walking => {}
        }

        let Some(commit) = self.pending.take() else {
            if let Some(id) = &self.awaiting {
                return Ok(ReplayStep::NeedCommit(id.clone()));
            }
            return Err(self.fail(Error::broken_chain("", "no commit to undo")));
        };

        // A stored commit that cannot be undone means the history is corrupt.
        let previous = match invert(&commit.patch, &self.document)
            .and_then(|inverse| apply(&self.document, &inverse))
        {
            Ok(doc) => doc,
            Err(e) if matches!(e.root_cause(), Error::TestFailed { .. }) => {
                return Err(self.fail(e))
            }
            Err(e) => {
                let err = Error::broken_chain(commit.id, format!("cannot undo commit: {}", e));
                return Err(self.fail(err));
            }
        };
        self.document = previous;
        self.version -= 1;

        if self.version == self.target {
            self.state = ReplayState::Done;
            return Ok(ReplayStep::Done);
        }

        match commit.parent_commit_id {
            Some(parent) => {
                self.awaiting = Some(parent.clone());
                Ok(ReplayStep::NeedCommit(parent))
            }
            None => Err(self.fail(Error::broken_chain(
                commit.id,
                format!(
                    "root reached at version {} before version {}",
                    self.version, self.target
                ),
            ))),
        }
    }

    /// Hand over the commit requested by [`ReplayStep::NeedCommit`].
    ///
    /// The commit must carry the requested ID and the version the document is
    /// currently at.
    pub fn supply(&mut self, commit: Commit) -> Result<()> {
        let Some(expected) = self.awaiting.take() else {
            return Err(Error::broken_chain(commit.id, "commit was not requested"));
        };
        if commit.id != expected {
            return Err(self.fail(Error::broken_chain(
                expected,
                format!("lookup returned commit {}", commit.id),
            )));
        }
        if commit.version != self.version {
            return Err(self.fail(Error::broken_chain(
                commit.id,
                format!(
                    "expected version {}, found {}",
                    self.version, commit.version
                ),
            )));
        }
        self.pending = Some(commit);
        Ok(())
    }

    fn fail(&mut self, err: Error) -> Error {
        self.state = ReplayState::Failed;
        self.failure = Some(err.clone());
        err
    }
}

/// Rebuild version `target` of a model, looking parents up in `source`.
///
/// A parent the chain references but `source` cannot produce is reported as
/// [`Error::BrokenChain`].
pub fn reconstruct<S>(
    target: i64,
    snapshot: Value,
    latest: Option<Commit>,
    source: &S,
) -> Result<Value>
where
    S: CommitSource + ?Sized,
{
    let mut replay = Replay::start(target, snapshot, latest)?;
    while let ReplayStep::NeedCommit(id) = replay.advance()? {
        let commit = source
            .commit_by_id(&id)
            .map_err(|e| Error::broken_chain(id.clone(), format!("parent lookup failed: {}", e)))?;
        replay.supply(commit)?;
    }
    Ok(replay.into_document())
}
