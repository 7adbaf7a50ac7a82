//! Commit endpoint routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use modelhub_engine::Commit;
use uuid::Uuid;

use crate::error::Result;
use crate::handlers::{
    handle_create_commit, handle_get_commit, handle_latest_commit, handle_list_commits,
    CreateCommitRequest, ListQuery,
};
use crate::AppState;

/// Create commit routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/models/{id}/commits", get(list_handler).post(create_handler))
        .route("/models/{id}/commits/latest", get(latest_handler))
        .route("/commits/{id}", get(get_handler))
}

/// POST /v0/models/{id}/commits - Record a change.
async fn create_handler(
    State(state): State<AppState>,
    Path(model_id): Path<Uuid>,
    Json(request): Json<CreateCommitRequest>,
) -> Result<(StatusCode, Json<Commit>)> {
    let commit = handle_create_commit(&state.pool, model_id, request).await?;
    Ok((StatusCode::CREATED, Json(commit)))
}

/// GET /v0/models/{id}/commits - History, newest first.
async fn list_handler(
    State(state): State<AppState>,
    Path(model_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Commit>>> {
    let commits = handle_list_commits(&state.pool, model_id, query).await?;
    Ok(Json(commits))
}

/// GET /v0/models/{id}/commits/latest - Newest commit.
async fn latest_handler(
    State(state): State<AppState>,
    Path(model_id): Path<Uuid>,
) -> Result<Json<Commit>> {
    let commit = handle_latest_commit(&state.pool, model_id).await?;
    Ok(Json(commit))
}

/// GET /v0/commits/{id} - A single commit.
async fn get_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Commit>> {
    let commit = handle_get_commit(&state.pool, id).await?;
    Ok(Json(commit))
}
