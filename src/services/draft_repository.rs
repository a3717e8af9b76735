//! CRUD access to the `drafts` table.

use crate::models::draft::{Draft, NewDraft};
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait DraftRepository: Send + Sync {
    /// All drafts, newest (highest id) first.
    async fn list(&self) -> RepositoryResult<Vec<Draft>>;

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Draft>>;

    /// Insert one row. The assigned id is not returned; callers re-list.
    async fn insert(&self, draft: NewDraft) -> RepositoryResult<()>;

    /// Delete the row with `id`. A missing id is not an error.
    async fn delete_by_id(&self, id: i64) -> RepositoryResult<()>;
}

#[derive(Clone)]
pub struct SqliteDraftRepository {
    db: Arc<SqlitePool>,
}

impl SqliteDraftRepository {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DraftRepository for SqliteDraftRepository {
    async fn list(&self) -> RepositoryResult<Vec<Draft>> {
        let drafts = sqlx::query_as::<_, Draft>(
            "SELECT id, title, caption, media_url FROM drafts ORDER BY id DESC",
        )
        .fetch_all(&*self.db)
        .await?;
        Ok(drafts)
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Draft>> {
        let draft = sqlx::query_as::<_, Draft>(
            "SELECT id, title, caption, media_url FROM drafts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(draft)
    }

    async fn insert(&self, draft: NewDraft) -> RepositoryResult<()> {
        sqlx::query("INSERT INTO drafts (title, caption, media_url) VALUES (?, ?, ?)")
            .bind(&draft.title)
            .bind(&draft.caption)
            .bind(&draft.media_url)
            .execute(&*self.db)
            .await?;
        Ok(())
    }

    async fn delete_by_id(&self, id: i64) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM drafts WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            tracing::debug!("draft {} was already absent", id);
        }
        Ok(())
    }
}
