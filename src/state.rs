use crate::services::{
    backend::BackendClient, draft_repository::SqliteDraftRepository,
    draft_workflow::DraftWorkflow, media_store::StorageResult,
};
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub backend: BackendClient,
    pub workflow: Arc<DraftWorkflow>,
}

impl AppState {
    /// Wire the media store for `bucket` and the draft repository over one
    /// backend client.
    pub fn new(backend: BackendClient, bucket: &str) -> StorageResult<Self> {
        let media = backend.bucket(bucket)?;
        let drafts = SqliteDraftRepository::new(backend.db.clone());
        let workflow = DraftWorkflow::new(Arc::new(media), Arc::new(drafts));
        Ok(Self {
            backend,
            workflow: Arc::new(workflow),
        })
    }
}
