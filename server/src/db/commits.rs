//! Database operations for the commits table.

use modelhub_engine::{Commit, Patch};
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

/// A stored commit row from the database.
#[derive(Debug)]
pub struct StoredCommit {
    pub id: Uuid,
    pub parent_commit_id: Option<Uuid>,
    pub model_id: Uuid,
    pub author_id: String,
    pub patch: serde_json::Value,
    pub version: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredCommit {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredCommit {
            id: row.try_get("id")?,
            parent_commit_id: row.try_get("parent_commit_id")?,
            model_id: row.try_get("model_id")?,
            author_id: row.try_get("author_id")?,
            patch: row.try_get("patch")?,
            version: row.try_get("version")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl StoredCommit {
    /// Convert database row to an engine commit.
    pub fn to_commit(&self) -> Result<Commit, modelhub_engine::Error> {
        Ok(Commit {
            id: self.id.to_string(),
            parent_commit_id: self.parent_commit_id.map(|id| id.to_string()),
            patch: Patch::from_value(self.patch.clone())?,
            model_id: self.model_id.to_string(),
            author_id: self.author_id.clone(),
            version: self.version.max(0) as u64,
            created_at: self.created_at.timestamp_millis().max(0) as u64,
        })
    }
}

/// A commit about to be written.
#[derive(Debug)]
pub struct NewCommit<'a> {
    pub id: Uuid,
    pub parent_commit_id: Option<Uuid>,
    pub model_id: Uuid,
    pub author_id: &'a str,
    pub patch: &'a Patch,
    pub version: i64,
}

/// Insert a commit inside the caller's transaction.
pub async fn create_commit(
    conn: &mut PgConnection,
    commit: &NewCommit<'_>,
) -> Result<StoredCommit, sqlx::Error> {
    // Sent as text: values inside the patch are re-inserted on replay and must
    // keep their member order.
    let patch = serde_json::to_string(commit.patch).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
    sqlx::query_as::<_, StoredCommit>(
        r#"
        INSERT INTO commits (id, parent_commit_id, model_id, author_id, patch, version)
        VALUES ($1, $2, $3, $4, CAST($5 AS JSON), $6)
        RETURNING id, parent_commit_id, model_id, author_id, patch, version, created_at
        "#,
    )
    .bind(commit.id)
    .bind(commit.parent_commit_id)
    .bind(commit.model_id)
    .bind(commit.author_id)
    .bind(patch)
    .bind(commit.version)
    .fetch_one(conn)
    .await
}

/// Get a commit by ID.
pub async fn get_commit_by_id(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<StoredCommit>, sqlx::Error> {
    sqlx::query_as::<_, StoredCommit>(
        r#"
        SELECT id, parent_commit_id, model_id, author_id, patch, version, created_at
        FROM commits
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Get the highest-version commit of a model.
pub async fn get_latest_commit(
    pool: &PgPool,
    model_id: Uuid,
) -> Result<Option<StoredCommit>, sqlx::Error> {
    sqlx::query_as::<_, StoredCommit>(
        r#"
        SELECT id, parent_commit_id, model_id, author_id, patch, version, created_at
        FROM commits
        WHERE model_id = $1
        ORDER BY version DESC
        LIMIT 1
        "#,
    )
    .bind(model_id)
    .fetch_optional(pool)
    .await
}

/// List a model's commits, newest first.
pub async fn list_commits_for_model(
    pool: &PgPool,
    model_id: Uuid,
    before_version: Option<i64>,
    limit: i64,
) -> Result<Vec<StoredCommit>, sqlx::Error> {
    sqlx::query_as::<_, StoredCommit>(
        r#"
        SELECT id, parent_commit_id, model_id, author_id, patch, version, created_at
        FROM commits
        WHERE model_id = $1 AND ($2::BIGINT IS NULL OR version < $2)
        ORDER BY version DESC
        LIMIT $3
        "#,
    )
    .bind(model_id)
    .bind(before_version)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Check if a SQL error is a unique constraint violation.
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = e {
        // PostgreSQL unique violation code is "23505"
        db_err.code().map(|c| c == "23505").unwrap_or(false)
    } else {
        false
    }
}
