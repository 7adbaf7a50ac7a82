//! Model handlers - create and read models.

use crate::db::{self, StoredModel};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

/// Request body for creating a model.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateModelRequest {
    pub name: String,
    /// Model this one is forked from
    #[serde(default)]
    pub parent_model_id: Option<Uuid>,
    /// Initial document; the parent's latest document when forking, otherwise
    /// an empty object, when omitted
    #[serde(default)]
    pub document: Option<Value>,
}

/// A model with its latest document.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelResponse {
    pub id: Uuid,
    pub name: String,
    pub parent_model_id: Option<Uuid>,
    pub document: Value,
    pub version: i64,
    pub latest_commit_id: Option<Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<StoredModel> for ModelResponse {
    fn from(model: StoredModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            parent_model_id: model.parent_model_id,
            document: model.document,
            version: model.version,
            latest_commit_id: model.latest_commit_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// A model without its document, for listings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSummary {
    pub id: Uuid,
    pub name: String,
    pub parent_model_id: Option<Uuid>,
    pub version: i64,
    pub latest_commit_id: Option<Uuid>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<StoredModel> for ModelSummary {
    fn from(model: StoredModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            parent_model_id: model.parent_model_id,
            version: model.version,
            latest_commit_id: model.latest_commit_id,
            updated_at: model.updated_at,
        }
    }
}

/// Query parameters for listings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// Maximum number of entries to return
    pub limit: Option<i64>,
    /// Only commits below this version
    pub before: Option<i64>,
}

/// Default limit for listings.
const DEFAULT_LIMIT: i64 = 100;

/// Maximum limit for listings.
const MAX_LIMIT: i64 = 1000;

impl ListQuery {
    pub fn limit(&self) -> i64 {
        self.limit
            .map(|l| l.clamp(1, MAX_LIMIT))
            .unwrap_or(DEFAULT_LIMIT)
    }
}

/// Query parameters for model search.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Substring of the model name
    pub name: Option<String>,
    /// Substring of the author of any commit on the model
    pub author: Option<String>,
    pub limit: Option<i64>,
}

impl SearchQuery {
    /// Trimmed, non-empty search terms. At least one is required.
    pub fn terms(&self) -> Result<(Option<&str>, Option<&str>)> {
        fn term(t: &Option<String>) -> Option<&str> {
            t.as_deref().map(str::trim).filter(|t| !t.is_empty())
        }
        match (term(&self.name), term(&self.author)) {
            (None, None) => Err(AppError::BadRequest(
                "search needs a name or an author".to_string(),
            )),
            terms => Ok(terms),
        }
    }

    pub fn limit(&self) -> i64 {
        ListQuery {
            limit: self.limit,
            before: None,
        }
        .limit()
    }
}

/// Validate a create request and return the initial document.
///
/// `parent_document` is the latest document of the model being forked.
pub fn initial_document(
    request: &CreateModelRequest,
    parent_document: Option<&Value>,
) -> Result<Value> {
    if request.name.trim().is_empty() {
        return Err(AppError::BadRequest("model name must not be empty".to_string()));
    }
    Ok(match (&request.document, parent_document) {
        (Some(document), _) => document.clone(),
        (None, Some(parent)) => parent.clone(),
        (None, None) => Value::Object(Default::default()),
    })
}

/// Create a model at version 0, optionally forked from another model.
pub async fn handle_create_model(
    pool: &PgPool,
    request: CreateModelRequest,
) -> Result<ModelResponse> {
    let parent = match request.parent_model_id {
        Some(parent_id) => Some(db::get_model(pool, parent_id).await?.ok_or_else(|| {
            AppError::BadRequest(format!("parent model {} does not exist", parent_id))
        })?),
        None => None,
    };

    let document = initial_document(&request, parent.as_ref().map(|p| &p.document))?;
    let model = db::insert_model(
        pool,
        Uuid::new_v4(),
        request.name.trim(),
        request.parent_model_id,
        &document,
    )
    .await?;
    tracing::info!(
        model_id = %model.id,
        name = %model.name,
        parent = ?model.parent_model_id,
        "Created model"
    );
    Ok(model.into())
}

/// Fetch a model with its latest document.
pub async fn handle_get_model(pool: &PgPool, id: Uuid) -> Result<ModelResponse> {
    db::get_model(pool, id)
        .await?
        .map(ModelResponse::from)
        .ok_or_else(|| AppError::NotFound(format!("model {}", id)))
}

/// List models, most recently updated first.
pub async fn handle_list_models(pool: &PgPool, query: ListQuery) -> Result<Vec<ModelSummary>> {
    let models = db::list_models(pool, query.limit()).await?;
    Ok(models.into_iter().map(ModelSummary::from).collect())
}

async fn require_model(pool: &PgPool, id: Uuid) -> Result<()> {
    match db::get_model(pool, id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound(format!("model {}", id))),
    }
}

/// Ancestors of a model, earliest first.
pub async fn handle_get_lineage(pool: &PgPool, id: Uuid) -> Result<Vec<ModelSummary>> {
    require_model(pool, id).await?;
    let lineage = db::get_lineage(pool, id).await?;
    Ok(lineage.into_iter().map(ModelSummary::from).collect())
}

/// Models forked directly from a model.
pub async fn handle_get_children(pool: &PgPool, id: Uuid) -> Result<Vec<ModelSummary>> {
    require_model(pool, id).await?;
    let children = db::get_children(pool, id).await?;
    Ok(children.into_iter().map(ModelSummary::from).collect())
}

/// Search models by name and commit author.
pub async fn handle_search_models(
    pool: &PgPool,
    query: SearchQuery,
) -> Result<Vec<ModelSummary>> {
    let (name, author) = query.terms()?;
    let models = db::search_models(pool, name, author, query.limit()).await?;
    tracing::debug!(?name, ?author, found = models.len(), "Searched models");
    Ok(models.into_iter().map(ModelSummary::from).collect())
}
