//! Backend client: the single handle to the relational store and to object
//! storage, built once at startup and passed to every service that needs it.

use crate::services::media_store::{BucketStore, StorageResult};
use anyhow::Result;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{path::PathBuf, str::FromStr, sync::Arc};

const MIGRATION_SQL: &str = include_str!("../../migrations/0001_init.sql");

/// Credentials the backend client acts with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Credentials {
    /// Read and upload only.
    Anon,
    /// Elevated credentials; required to remove stored objects.
    ServiceRole,
}

impl Credentials {
    /// Service role when a (non-empty) service key is configured.
    pub fn from_service_key(key: Option<&str>) -> Self {
        match key {
            Some(key) if !key.trim().is_empty() => Credentials::ServiceRole,
            _ => Credentials::Anon,
        }
    }
}

#[derive(Clone)]
pub struct BackendClient {
    /// Shared SQLite connection pool for drafts and object metadata.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where object payloads are stored.
    pub storage_root: PathBuf,

    /// Prefix for public object URLs, without a trailing slash.
    pub public_base_url: String,

    pub credentials: Credentials,
}

impl BackendClient {
    pub fn new(
        db: Arc<SqlitePool>,
        storage_root: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        let public_base_url: String = public_base_url.into();
        Self {
            db,
            storage_root: storage_root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    /// Object storage scoped to one bucket.
    pub fn bucket(&self, name: &str) -> StorageResult<BucketStore> {
        BucketStore::new(self.clone(), name)
    }

    pub fn is_privileged(&self) -> bool {
        self.credentials == Credentials::ServiceRole
    }
}

/// Open a SQLite pool, creating the database file (and its directory) if needed.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    if let Some(parent) = options.get_filename().parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Run the embedded schema migration. Every statement is idempotent.
pub async fn run_migrations(db: &SqlitePool) -> Result<()> {
    let statements = MIGRATION_SQL
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    tracing::info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        tracing::debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(db).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_key_grants_service_role() {
        assert_eq!(
            Credentials::from_service_key(Some("key")),
            Credentials::ServiceRole
        );
        assert_eq!(Credentials::from_service_key(Some(" ")), Credentials::Anon);
        assert_eq!(Credentials::from_service_key(None), Credentials::Anon);
    }

    #[tokio::test]
    async fn migrations_create_tables_and_are_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("meta/drafts.db").display());
        let pool = connect(&url).await.unwrap();

        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('drafts', 'objects') ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(tables, vec!["drafts".to_string(), "objects".to_string()]);
    }
}
