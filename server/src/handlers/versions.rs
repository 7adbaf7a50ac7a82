//! Version handler - rebuilds historical documents.
//!
//! The engine's [`Replay`] state machine asks for one parent commit at a time;
//! each request becomes a single query here. The snapshot read and the whole
//! walk run under the configured timeout and are dropped once it expires.

use crate::db;
use crate::error::{AppError, Result};
use modelhub_engine::{Commit, Error as EngineError, Replay, ReplayStep};
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

/// A document at a specific version.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionResponse {
    pub model_id: Uuid,
    pub version: i64,
    pub document: Value,
}

/// Load the commit the replay asked for.
async fn load_commit(pool: &PgPool, id: &str) -> Result<Commit> {
    let uuid = Uuid::parse_str(id).map_err(|_| {
        AppError::Engine(EngineError::BrokenChain {
            commit: id.to_string(),
            reason: "parent id is not a UUID".to_string(),
        })
    })?;
    let stored = db::get_commit_by_id(pool, uuid).await?.ok_or_else(|| {
        AppError::Engine(EngineError::BrokenChain {
            commit: id.to_string(),
            reason: "commit is missing".to_string(),
        })
    })?;
    stored.to_commit().map_err(AppError::from)
}

/// Feed commits to the replay until it reaches its target.
async fn drive(pool: &PgPool, replay: &mut Replay) -> Result<()> {
    while let ReplayStep::NeedCommit(id) = replay.advance()? {
        let commit = load_commit(pool, &id).await?;
        tracing::trace!(commit_id = %id, version = commit.version, "Undoing commit");
        replay.supply(commit)?;
    }
    Ok(())
}

/// Run `work` under the replay budget.
async fn within<T, F>(timeout: Duration, work: F, what: impl FnOnce() -> String) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, work).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout(format!("{} after {:?}", what(), timeout))),
    }
}

/// Read the latest snapshot and undo commits down to `version`.
async fn rebuild(pool: &PgPool, model_id: Uuid, version: i64) -> Result<Value> {
    let snapshot = db::get_current_snapshot(pool, model_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("model {}", model_id)))?;

    let latest = match snapshot.latest_commit_id {
        Some(id) => {
            let commit = load_commit(pool, &id.to_string()).await?;
            if commit.version as i64 != snapshot.version {
                return Err(AppError::Engine(EngineError::BrokenChain {
                    commit: commit.id,
                    reason: format!(
                        "model is at version {} but its latest commit is version {}",
                        snapshot.version, commit.version
                    ),
                }));
            }
            Some(commit)
        }
        None => None,
    };

    let mut replay = Replay::start(version, snapshot.document, latest)?;
    let steps = replay.version() - replay.target();
    drive(pool, &mut replay).await?;

    tracing::debug!(model_id = %model_id, version, steps, "Rebuilt version");
    Ok(replay.into_document())
}

/// Rebuild `version` of a model.
///
/// The snapshot read, the latest-commit lookup and every parent lookup all
/// count against `timeout`.
pub async fn handle_get_version(
    pool: &PgPool,
    model_id: Uuid,
    version: i64,
    timeout: Duration,
) -> Result<VersionResponse> {
    let document = within(timeout, rebuild(pool, model_id, version), || {
        format!("rebuilding version {} of model {} stopped", version, model_id)
    })
    .await?;

    Ok(VersionResponse {
        model_id,
        version,
        document,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn slow_work_times_out() {
        let err = within(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
            || "rebuilding version 1".to_string(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Timeout(ref msg) if msg.starts_with("rebuilding version 1")));
        assert_eq!(err.status(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn work_errors_pass_through() {
        let err = within(
            Duration::from_secs(5),
            async { Err::<(), _>(AppError::NotFound("model".to_string())) },
            || unreachable!(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
