//! Draft workflow: create and delete drafts, keeping each draft row and its
//! media object in step.
//!
//! Create runs validate, key, upload, public URL, insert. A failed insert
//! leaves the uploaded object in place (logged as orphaned); there is no
//! compensating removal.
//!
//! Delete removes the object first, then the row. Object removal is best
//! effort: failures are logged and the row is still deleted. A failed row
//! deletion is returned to the caller.

use crate::{
    models::draft::{Draft, NewDraft},
    services::{
        draft_repository::{DraftRepository, RepositoryError},
        media_store::{MediaStore, StorageError},
    },
    utils::filename::{generate_storage_key, key_from_url},
};
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

const GENERIC_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Upload(#[source] StorageError),
    #[error("{0}")]
    Insert(#[source] RepositoryError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type DraftResult<T> = Result<T, DraftError>;

/// A file part as received from the form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    /// Browsers submit an unnamed, empty part for an untouched file picker.
    fn is_present(&self) -> bool {
        !(self.file_name.is_empty() && self.bytes.is_empty())
    }

    /// Declared media type, falling back to a guess from the file name.
    pub fn media_type(&self) -> String {
        match self.content_type.as_deref() {
            Some(declared) if !declared.is_empty() && declared != GENERIC_CONTENT_TYPE => {
                declared.to_string()
            }
            _ => mime_guess::from_path(&self.file_name)
                .first()
                .map(|m| m.essence_str().to_string())
                .unwrap_or_else(|| GENERIC_CONTENT_TYPE.to_string()),
        }
    }
}

/// Form input for creating a draft.
#[derive(Debug, Clone, Default)]
pub struct DraftUpload {
    pub title: String,
    pub caption: String,
    pub file: Option<UploadedFile>,
}

/// Input that passed validation.
struct ValidUpload<'a> {
    title: &'a str,
    caption: &'a str,
    file: &'a UploadedFile,
    media_type: String,
}

impl DraftUpload {
    fn validate(&self) -> DraftResult<ValidUpload<'_>> {
        if self.title.trim().is_empty() {
            return Err(DraftError::Validation("Title is required.".into()));
        }
        if self.caption.trim().is_empty() {
            return Err(DraftError::Validation("Caption is required.".into()));
        }
        let file = match &self.file {
            Some(file) if file.is_present() => file,
            _ => return Err(DraftError::Validation("No file selected.".into())),
        };
        let media_type = file.media_type();
        if !(media_type.starts_with("image/") || media_type.starts_with("video/")) {
            return Err(DraftError::Validation(format!(
                "Unsupported media type `{}`: only images and videos are accepted.",
                media_type
            )));
        }
        Ok(ValidUpload {
            title: &self.title,
            caption: &self.caption,
            file,
            media_type,
        })
    }
}

pub struct DraftWorkflow {
    media: Arc<dyn MediaStore>,
    drafts: Arc<dyn DraftRepository>,
}

impl DraftWorkflow {
    pub fn new(media: Arc<dyn MediaStore>, drafts: Arc<dyn DraftRepository>) -> Self {
        Self { media, drafts }
    }

    pub async fn list(&self) -> DraftResult<Vec<Draft>> {
        Ok(self.drafts.list().await?)
    }

    /// Create a draft and return its media URL.
    ///
    /// Nothing touches the backend until the input validates.
    pub async fn create(&self, upload: &DraftUpload) -> DraftResult<String> {
        let valid = upload.validate()?;

        let key = generate_storage_key(&valid.file.file_name);
        self.media
            .upload(&key, valid.file.bytes.clone(), &valid.media_type)
            .await
            .map_err(|err| {
                warn!("upload of {} failed: {}", key, err);
                DraftError::Upload(err)
            })?;

        let media_url = self.media.public_url(&key);

        let row = NewDraft {
            title: valid.title.to_string(),
            caption: valid.caption.to_string(),
            media_url: media_url.clone(),
        };
        if let Err(err) = self.drafts.insert(row).await {
            error!(
                key = %key,
                "draft insert failed after upload, object left orphaned: {}", err
            );
            return Err(DraftError::Insert(err));
        }

        info!("created draft with media {}", key);
        Ok(media_url)
    }

    /// Delete `draft` and its media object.
    pub async fn delete(&self, draft: &Draft) -> DraftResult<()> {
        match key_from_url(&draft.media_url) {
            Some(key) => {
                if let Err(err) = self.media.remove(key).await {
                    warn!(
                        draft_id = draft.id,
                        key = %key,
                        "could not remove media, deleting draft anyway: {}", err
                    );
                }
            }
            None => warn!(
                draft_id = draft.id,
                "media url `{}` has no storage key", draft.media_url
            ),
        }

        self.drafts.delete_by_id(draft.id).await.map_err(|err| {
            error!(draft_id = draft.id, "draft row deletion failed: {}", err);
            DraftError::Repository(err)
        })?;

        info!("deleted draft {}", draft.id);
        Ok(())
    }

    /// Delete by id. Unknown ids are a no-op.
    pub async fn delete_by_id(&self, id: i64) -> DraftResult<()> {
        match self.drafts.find_by_id(id).await? {
            Some(draft) => self.delete(&draft).await,
            None => {
                info!("draft {} not found, nothing to delete", id);
                Ok(())
            }
        }
    }
}
