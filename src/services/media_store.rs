//! Media store: bucket-scoped blob storage with metadata in SQLite and
//! payloads on local disk sharded beneath `root/{bucket}/{shard}/{shard}/{key}`.

use crate::{models::object::StoredObject, services::backend::BackendClient};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("bucket `{name}` invalid: {reason}")]
    InvalidBucketName { name: String, reason: String },
    #[error("object `{key}` already exists in bucket `{bucket}`")]
    ObjectAlreadyExists { bucket: String, key: String },
    #[error("object `{key}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: String, key: String },
    #[error("invalid object key")]
    InvalidObjectKey,
    #[error("removing objects requires service role credentials")]
    Unauthorized,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Blob storage used by the draft workflow.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store `bytes` under `key`. Never overwrites an existing key.
    async fn upload(&self, key: &str, bytes: Bytes, content_type: &str) -> StorageResult<()>;

    /// Public URL for `key`. The key is the URL's last path segment.
    fn public_url(&self, key: &str) -> String;

    /// Remove the object under `key`. Removing a missing key succeeds.
    async fn remove(&self, key: &str) -> StorageResult<()>;
}

const MAX_OBJECT_KEY_LEN: usize = 1024;
const BUCKET_NAME_MIN_LEN: usize = 3;
const BUCKET_NAME_MAX_LEN: usize = 63;

/// One bucket of the backend's object storage.
#[derive(Clone)]
pub struct BucketStore {
    backend: BackendClient,
    bucket: String,
}

impl BucketStore {
    pub fn new(backend: BackendClient, bucket: impl Into<String>) -> StorageResult<Self> {
        let bucket = bucket.into();
        ensure_bucket_name_safe(&bucket)?;
        Ok(Self { backend, bucket })
    }

    /// Reject keys that could escape the bucket directory or break URLs.
    fn ensure_key_safe(&self, key: &str) -> StorageResult<()> {
        if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
            return Err(StorageError::InvalidObjectKey);
        }
        if key.starts_with('.') || key.contains("..") {
            return Err(StorageError::InvalidObjectKey);
        }
        if key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'/' || b == b'\\')
        {
            return Err(StorageError::InvalidObjectKey);
        }
        Ok(())
    }

    fn bucket_root(&self) -> PathBuf {
        self.backend.storage_root.join(&self.bucket)
    }

    /// Two-level shard directories from MD5(bucket/key), keeping directory
    /// sizes bounded.
    fn object_shards(&self, key: &str) -> (String, String) {
        let digest = md5::compute(format!("{}/{}", self.bucket, key));
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    fn object_path(&self, key: &str) -> PathBuf {
        let (shard_a, shard_b) = self.object_shards(key);
        let mut path = self.bucket_root();
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }

    fn already_exists(&self, key: &str) -> StorageError {
        StorageError::ObjectAlreadyExists {
            bucket: self.bucket.clone(),
            key: key.to_string(),
        }
    }

    fn not_found(&self, key: &str) -> StorageError {
        StorageError::ObjectNotFound {
            bucket: self.bucket.clone(),
            key: key.to_string(),
        }
    }

    async fn fetch_object(&self, key: &str) -> StorageResult<StoredObject> {
        sqlx::query_as::<_, StoredObject>(
            "SELECT id, bucket, key, content_type, size_bytes, etag, last_modified
             FROM objects WHERE bucket = ? AND key = ?",
        )
        .bind(&self.bucket)
        .bind(key)
        .fetch_one(&*self.backend.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => self.not_found(key),
            other => StorageError::Sqlx(other),
        })
    }

    /// Metadata plus an open handle to the payload, for serving.
    pub async fn open(&self, key: &str) -> StorageResult<(StoredObject, File)> {
        self.ensure_key_safe(key)?;
        let object = self.fetch_object(key).await?;
        let file = File::open(self.object_path(key))
            .await
            .map_err(|err| match err.kind() {
                ErrorKind::NotFound => self.not_found(key),
                _ => StorageError::Io(err),
            })?;
        Ok((object, file))
    }

    /// Metadata only.
    pub async fn stat(&self, key: &str) -> StorageResult<StoredObject> {
        self.ensure_key_safe(key)?;
        self.fetch_object(key).await
    }

    /// Write `bytes` to a temp file, fsync it, and hard-link it into place.
    ///
    /// The link fails if the target exists, so an existing payload is never
    /// replaced.
    async fn write_payload(&self, key: &str, bytes: &[u8]) -> StorageResult<PathBuf> {
        let file_path = self.object_path(key);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StorageError::Io(io::Error::other("object path missing parent directory"))
        })?;
        fs::create_dir_all(&parent).await?;

        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let written: io::Result<()> = async {
            let mut file = File::create(&tmp_path).await?;
            file.write_all(bytes).await?;
            file.flush().await?;
            file.sync_all().await?;
            fs::hard_link(&tmp_path, &file_path).await
        }
        .await;
        let _ = fs::remove_file(&tmp_path).await;

        match written {
            Ok(()) => Ok(file_path),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => Err(self.already_exists(key)),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    /// Remove empty shard directories up to (not including) the bucket root.
    async fn prune_empty_dirs(&self, start: &Path) {
        let stop = self.bucket_root();
        let mut current = start.to_path_buf();
        while current.starts_with(&stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(_) => match current.parent() {
                    Some(parent) => current = parent.to_path_buf(),
                    None => break,
                },
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl MediaStore for BucketStore {
    async fn upload(&self, key: &str, bytes: Bytes, content_type: &str) -> StorageResult<()> {
        self.ensure_key_safe(key)?;
        match self.fetch_object(key).await {
            Ok(_) => return Err(self.already_exists(key)),
            Err(StorageError::ObjectNotFound { .. }) => {}
            Err(err) => return Err(err),
        }

        let file_path = self.write_payload(key, &bytes).await?;
        let etag = format!("{:x}", md5::compute(&bytes));

        let inserted = sqlx::query(
            "INSERT INTO objects (id, bucket, key, content_type, size_bytes, etag, last_modified)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4())
        .bind(&self.bucket)
        .bind(key)
        .bind(content_type)
        .bind(bytes.len() as i64)
        .bind(&etag)
        .bind(Utc::now())
        .execute(&*self.backend.db)
        .await;

        match inserted {
            Ok(_) => {
                debug!("stored {} ({} bytes) in {}", key, bytes.len(), self.bucket);
                Ok(())
            }
            Err(err) => {
                let _ = fs::remove_file(&file_path).await;
                if is_unique_violation(&err) {
                    Err(self.already_exists(key))
                } else {
                    Err(StorageError::Sqlx(err))
                }
            }
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.backend.public_base_url, self.bucket, key
        )
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        if !self.backend.is_privileged() {
            return Err(StorageError::Unauthorized);
        }
        self.ensure_key_safe(key)?;

        let result = sqlx::query("DELETE FROM objects WHERE bucket = ? AND key = ?")
            .bind(&self.bucket)
            .bind(key)
            .execute(&*self.backend.db)
            .await?;
        if result.rows_affected() == 0 {
            debug!("object {} had no metadata in {}", key, self.bucket);
        }

        let file_path = self.object_path(key);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed physical file {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("file {} already missing", file_path.display());
            }
            Err(err) => return Err(StorageError::Io(err)),
        }

        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent).await;
        }

        Ok(())
    }
}

/// Lowercase letters, digits and hyphens; 3-63 chars; no leading or trailing hyphen.
fn ensure_bucket_name_safe(name: &str) -> StorageResult<()> {
    let invalid = |reason: &str| StorageError::InvalidBucketName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.len() < BUCKET_NAME_MIN_LEN || name.len() > BUCKET_NAME_MAX_LEN {
        return Err(invalid("must be between 3 and 63 characters"));
    }
    if !name
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '-'))
    {
        return Err(invalid(
            "allowed characters are lowercase letters, digits, and hyphens",
        ));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(invalid("must start and end with a lowercase letter or digit"));
    }
    Ok(())
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::backend::{self, Credentials};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    async fn store_with(credentials: Credentials) -> (TempDir, BucketStore) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("test.db").display());
        let pool = backend::connect(&url).await.unwrap();
        backend::run_migrations(&pool).await.unwrap();
        let client = BackendClient::new(
            Arc::new(pool),
            dir.path().join("objects"),
            "http://media.test/",
            credentials,
        );
        let store = client.bucket("post-media").unwrap();
        (dir, store)
    }

    async fn read_back(store: &BucketStore, key: &str) -> (StoredObject, Vec<u8>) {
        let (meta, mut file) = store.open(key).await.unwrap();
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await.unwrap();
        (meta, buf)
    }

    #[tokio::test]
    async fn upload_then_open_returns_identical_bytes() {
        let (_dir, store) = store_with(Credentials::ServiceRole).await;
        store
            .upload("1-aa.png", Bytes::from_static(b"\x89PNG data"), "image/png")
            .await
            .unwrap();

        let (meta, bytes) = read_back(&store, "1-aa.png").await;
        assert_eq!(bytes, b"\x89PNG data");
        assert_eq!(meta.content_type.as_deref(), Some("image/png"));
        assert_eq!(meta.size_bytes, 9);
        assert_eq!(meta.etag, format!("{:x}", md5::compute(b"\x89PNG data")));
    }

    #[tokio::test]
    async fn upload_refuses_to_overwrite() {
        let (_dir, store) = store_with(Credentials::ServiceRole).await;
        store
            .upload("1-bb.jpg", Bytes::from_static(b"first"), "image/jpeg")
            .await
            .unwrap();

        let err = store
            .upload("1-bb.jpg", Bytes::from_static(b"second"), "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ObjectAlreadyExists { .. }));

        let (_, bytes) = read_back(&store, "1-bb.jpg").await;
        assert_eq!(bytes, b"first");
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let (_dir, store) = store_with(Credentials::ServiceRole).await;
        store
            .upload("1-cc.mp4", Bytes::from_static(b"video"), "video/mp4")
            .await
            .unwrap();

        store.remove("1-cc.mp4").await.unwrap();
        store.remove("1-cc.mp4").await.unwrap();
        store.remove("never-existed.png").await.unwrap();

        assert!(matches!(
            store.open("1-cc.mp4").await,
            Err(StorageError::ObjectNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn remove_prunes_shard_directories() {
        let (_dir, store) = store_with(Credentials::ServiceRole).await;
        store
            .upload("1-dd.png", Bytes::from_static(b"x"), "image/png")
            .await
            .unwrap();
        let shard_dir = store.object_path("1-dd.png").parent().unwrap().to_path_buf();
        assert!(shard_dir.exists());

        store.remove("1-dd.png").await.unwrap();
        assert!(!shard_dir.exists());
        assert!(store.bucket_root().exists());
    }

    #[tokio::test]
    async fn anonymous_remove_is_rejected() {
        let (_dir, store) = store_with(Credentials::Anon).await;
        store
            .upload("1-ee.png", Bytes::from_static(b"x"), "image/png")
            .await
            .unwrap();

        let err = store.remove("1-ee.png").await.unwrap_err();
        assert!(matches!(err, StorageError::Unauthorized));
        assert!(store.open("1-ee.png").await.is_ok());
    }

    #[tokio::test]
    async fn unsafe_keys_are_rejected() {
        let (_dir, store) = store_with(Credentials::ServiceRole).await;
        for key in ["", "../escape.png", "a/b.png", ".hidden", "a\\b", "tab\tkey"] {
            let err = store
                .upload(key, Bytes::from_static(b"x"), "image/png")
                .await
                .unwrap_err();
            assert!(matches!(err, StorageError::InvalidObjectKey), "key {:?}", key);
        }
    }

    #[tokio::test]
    async fn public_url_ends_with_key() {
        let (_dir, store) = store_with(Credentials::Anon).await;
        assert_eq!(
            store.public_url("1-ff.png"),
            "http://media.test/storage/v1/object/public/post-media/1-ff.png"
        );
    }

    #[test]
    fn bucket_names_are_validated() {
        assert!(ensure_bucket_name_safe("post-media").is_ok());
        assert!(ensure_bucket_name_safe("ab").is_err());
        assert!(ensure_bucket_name_safe("Post-Media").is_err());
        assert!(ensure_bucket_name_safe("-media").is_err());
        assert!(ensure_bucket_name_safe("media/x").is_err());
    }
}
