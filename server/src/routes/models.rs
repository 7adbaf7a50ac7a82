//! Model endpoint routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::error::Result;
use crate::handlers::{
    handle_create_model, handle_get_children, handle_get_lineage, handle_get_model,
    handle_get_version, handle_list_models, handle_search_models, CreateModelRequest, ListQuery,
    ModelResponse, ModelSummary, SearchQuery, VersionResponse,
};
use crate::AppState;

/// Create model routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/models", get(list_handler).post(create_handler))
        .route("/models/search", get(search_handler))
        .route("/models/{id}", get(get_handler))
        .route("/models/{id}/lineage", get(lineage_handler))
        .route("/models/{id}/children", get(children_handler))
        .route("/models/{id}/versions/{version}", get(version_handler))
}

/// POST /v0/models - Create a model.
async fn create_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateModelRequest>,
) -> Result<(StatusCode, Json<ModelResponse>)> {
    let model = handle_create_model(&state.pool, request).await?;
    Ok((StatusCode::CREATED, Json(model)))
}

/// GET /v0/models - List models.
async fn list_handler(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ModelSummary>>> {
    let models = handle_list_models(&state.pool, query).await?;
    Ok(Json(models))
}

/// GET /v0/models/{id} - Latest document of a model.
async fn get_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ModelResponse>> {
    let model = handle_get_model(&state.pool, id).await?;
    Ok(Json(model))
}

/// GET /v0/models/search?name=&author= - Search models.
async fn search_handler(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ModelSummary>>> {
    let models = handle_search_models(&state.pool, query).await?;
    Ok(Json(models))
}

/// GET /v0/models/{id}/lineage - Ancestors, earliest first.
async fn lineage_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ModelSummary>>> {
    let lineage = handle_get_lineage(&state.pool, id).await?;
    Ok(Json(lineage))
}

/// GET /v0/models/{id}/children - Direct forks.
async fn children_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ModelSummary>>> {
    let children = handle_get_children(&state.pool, id).await?;
    Ok(Json(children))
}

/// GET /v0/models/{id}/versions/{version} - Rebuild a historical version.
async fn version_handler(
    State(state): State<AppState>,
    Path((id, version)): Path<(Uuid, i64)>,
) -> Result<Json<VersionResponse>> {
    let response =
        handle_get_version(&state.pool, id, version, state.config.replay_timeout).await?;
    Ok(Json(response))
}
