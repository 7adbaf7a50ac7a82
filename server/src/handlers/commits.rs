//! Commit handlers - record changes and read history.

use crate::db::{self, NewCommit, StoredCommit};
use crate::error::{AppError, Result};
use crate::handlers::ListQuery;
use modelhub_engine::{apply, invert, Commit, Error as EngineError, Patch};
use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

/// Request body for recording a commit.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommitRequest {
    pub author_id: String,
    pub patch: Patch,
}

/// Apply `patch` to the current document and make sure it can be undone.
///
/// Returns the new document. A patch whose `test` operations fail against the
/// current document was written against an older version and is a conflict.
pub fn prepare_commit(current: &Value, version: i64, patch: &Patch) -> Result<Value> {
    if patch.is_empty() {
        return Err(AppError::BadRequest("patch must not be empty".to_string()));
    }

    let next = apply(current, patch).map_err(|e| match e.root_cause() {
        EngineError::TestFailed { pointer } => AppError::Conflict(format!(
            "patch does not match version {}: test failed at '{}'",
            version, pointer
        )),
        _ => AppError::BadRequest(format!("patch does not apply: {}", e)),
    })?;

    let inverse = invert(patch, &next)?;
    let restored = apply(&next, &inverse).map_err(|e| {
        AppError::BadRequest(format!("patch is not invertible: {}", e))
    })?;
    if &restored != current {
        return Err(AppError::BadRequest(
            "patch is not invertible: undoing it does not restore the document".to_string(),
        ));
    }

    Ok(next)
}

fn to_commit(stored: &StoredCommit) -> Result<Commit> {
    stored.to_commit().map_err(|e| {
        AppError::Internal(format!("commit {} has an unreadable patch: {}", stored.id, e))
    })
}

/// Record a commit on top of the latest version of a model.
pub async fn handle_create_commit(
    pool: &PgPool,
    model_id: Uuid,
    request: CreateCommitRequest,
) -> Result<Commit> {
    if request.author_id.trim().is_empty() {
        return Err(AppError::BadRequest("authorId must not be empty".to_string()));
    }

    let mut tx = pool.begin().await?;

    let model = db::lock_model(&mut tx, model_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("model {}", model_id)))?;

    let next = prepare_commit(&model.document, model.version, &request.patch)?;

    let new_commit = NewCommit {
        id: Uuid::new_v4(),
        parent_commit_id: model.latest_commit_id,
        model_id,
        author_id: request.author_id.trim(),
        patch: &request.patch,
        version: model.version + 1,
    };
    let stored = match db::create_commit(&mut tx, &new_commit).await {
        Ok(stored) => stored,
        Err(e) if db::is_unique_violation(&e) => {
            return Err(AppError::Conflict(format!(
                "version {} of model {} already exists",
                new_commit.version, model_id
            )));
        }
        Err(e) => return Err(e.into()),
    };

    db::update_snapshot(&mut tx, model_id, &next, stored.id, stored.version).await?;
    tx.commit().await?;

    tracing::info!(
        model_id = %model_id,
        commit_id = %stored.id,
        version = stored.version,
        ops = request.patch.len(),
        "Recorded commit"
    );

    to_commit(&stored)
}

/// Fetch a commit by ID.
pub async fn handle_get_commit(pool: &PgPool, id: Uuid) -> Result<Commit> {
    let stored = db::get_commit_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("commit {}", id)))?;
    to_commit(&stored)
}

/// Fetch the newest commit of a model.
pub async fn handle_latest_commit(pool: &PgPool, model_id: Uuid) -> Result<Commit> {
    let stored = db::get_latest_commit(pool, model_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no commits for model {}", model_id)))?;
    to_commit(&stored)
}

/// List a model's commits, newest first.
pub async fn handle_list_commits(
    pool: &PgPool,
    model_id: Uuid,
    query: ListQuery,
) -> Result<Vec<Commit>> {
    if db::get_model(pool, model_id).await?.is_none() {
        return Err(AppError::NotFound(format!("model {}", model_id)));
    }
    let stored = db::list_commits_for_model(pool, model_id, query.before, query.limit()).await?;
    stored.iter().map(to_commit).collect()
}
