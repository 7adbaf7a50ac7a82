//! Database operations for the models table.
//!
//! Documents live in a `JSON` column and are written as text, so object
//! members come back in the order they were stored.

use serde_json::Value;
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

/// A stored model row from the database.
#[derive(Debug)]
pub struct StoredModel {
    pub id: Uuid,
    pub name: String,
    pub parent_model_id: Option<Uuid>,
    pub document: Value,
    pub latest_commit_id: Option<Uuid>,
    pub version: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredModel {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredModel {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            parent_model_id: row.try_get("parent_model_id")?,
            document: row.try_get("document")?,
            latest_commit_id: row.try_get("latest_commit_id")?,
            version: row.try_get("version")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// The latest document of a model together with the commit that produced it.
#[derive(Debug)]
pub struct Snapshot {
    pub document: Value,
    pub latest_commit_id: Option<Uuid>,
    pub version: i64,
}

/// Text form of a document for the `JSON` column.
///
/// Binding a `Value` directly sends it as JSONB, which Postgres normalizes
/// (and reorders) before it ever reaches the column.
pub fn document_text(document: &Value) -> String {
    document.to_string()
}

/// Escape `%`, `_` and `\` and wrap the term for a substring `ILIKE`.
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Insert a new model at version 0.
pub async fn insert_model(
    pool: &PgPool,
    id: Uuid,
    name: &str,
    parent_model_id: Option<Uuid>,
    document: &Value,
) -> Result<StoredModel, sqlx::Error> {
    sqlx::query_as::<_, StoredModel>(
        r#"
        INSERT INTO models (id, name, parent_model_id, document, version)
        VALUES ($1, $2, $3, CAST($4 AS JSON), 0)
        RETURNING id, name, parent_model_id, document, latest_commit_id, version,
                  created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(parent_model_id)
    .bind(document_text(document))
    .fetch_one(pool)
    .await
}

/// Get a model by ID.
pub async fn get_model(pool: &PgPool, id: Uuid) -> Result<Option<StoredModel>, sqlx::Error> {
    sqlx::query_as::<_, StoredModel>(
        r#"
        SELECT id, name, parent_model_id, document, latest_commit_id, version,
               created_at, updated_at
        FROM models
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// List models, most recently updated first.
pub async fn list_models(pool: &PgPool, limit: i64) -> Result<Vec<StoredModel>, sqlx::Error> {
    sqlx::query_as::<_, StoredModel>(
        r#"
        SELECT id, name, parent_model_id, document, latest_commit_id, version,
               created_at, updated_at
        FROM models
        ORDER BY updated_at DESC, id ASC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Ancestors of a model, earliest first. The model itself is not included.
pub async fn get_lineage(pool: &PgPool, id: Uuid) -> Result<Vec<StoredModel>, sqlx::Error> {
    sqlx::query_as::<_, StoredModel>(
        r#"
        WITH RECURSIVE ancestors AS (
            SELECT parent.id, parent.parent_model_id, 1 AS depth
            FROM models child
            JOIN models parent ON parent.id = child.parent_model_id
            WHERE child.id = $1
            UNION ALL
            SELECT m.id, m.parent_model_id, a.depth + 1
            FROM models m
            JOIN ancestors a ON m.id = a.parent_model_id
        )
        SELECT m.id, m.name, m.parent_model_id, m.document, m.latest_commit_id, m.version,
               m.created_at, m.updated_at
        FROM ancestors a
        JOIN models m ON m.id = a.id
        ORDER BY a.depth DESC
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await
}

/// Models forked directly from `id`, oldest first.
pub async fn get_children(pool: &PgPool, id: Uuid) -> Result<Vec<StoredModel>, sqlx::Error> {
    sqlx::query_as::<_, StoredModel>(
        r#"
        SELECT id, name, parent_model_id, document, latest_commit_id, version,
               created_at, updated_at
        FROM models
        WHERE parent_model_id = $1
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await
}

/// Find models whose name contains `name` and, when `author` is given, that
/// have a commit by a matching author. Both matches ignore case.
pub async fn search_models(
    pool: &PgPool,
    name: Option<&str>,
    author: Option<&str>,
    limit: i64,
) -> Result<Vec<StoredModel>, sqlx::Error> {
    sqlx::query_as::<_, StoredModel>(
        r#"
        SELECT id, name, parent_model_id, document, latest_commit_id, version,
               created_at, updated_at
        FROM models
        WHERE ($1::TEXT IS NULL OR name ILIKE $1 ESCAPE '\')
          AND ($2::TEXT IS NULL OR EXISTS (
                SELECT 1 FROM commits c
                WHERE c.model_id = models.id AND c.author_id ILIKE $2 ESCAPE '\'
          ))
        ORDER BY updated_at DESC, id ASC
        LIMIT $3
        "#,
    )
    .bind(name.map(contains_pattern))
    .bind(author.map(contains_pattern))
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Get the latest document of a model.
pub async fn get_current_snapshot(
    pool: &PgPool,
    model_id: Uuid,
) -> Result<Option<Snapshot>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT document, latest_commit_id, version
        FROM models
        WHERE id = $1
        "#,
    )
    .bind(model_id)
    .fetch_optional(pool)
    .await?;

    row.map(|row| -> Result<Snapshot, sqlx::Error> {
        Ok(Snapshot {
            document: row.try_get("document")?,
            latest_commit_id: row.try_get("latest_commit_id")?,
            version: row.try_get("version")?,
        })
    })
    .transpose()
}

/// Load a model and lock its row until the surrounding transaction ends.
///
/// Concurrent commits to the same model serialize on this lock.
pub async fn lock_model(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<StoredModel>, sqlx::Error> {
    sqlx::query_as::<_, StoredModel>(
        r#"
        SELECT id, name, parent_model_id, document, latest_commit_id, version,
               created_at, updated_at
        FROM models
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await
}

/// Store a new latest document.
pub async fn update_snapshot(
    conn: &mut PgConnection,
    id: Uuid,
    document: &Value,
    latest_commit_id: Uuid,
    version: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE models
        SET document = CAST($2 AS JSON), latest_commit_id = $3, version = $4,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(document_text(document))
    .bind(latest_commit_id)
    .bind(version)
    .execute(conn)
    .await?;

    Ok(())
}
