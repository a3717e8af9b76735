//! Multipart parsing shared by the JSON API and the HTML form.

use crate::{
    errors::AppError,
    services::draft_workflow::{DraftUpload, UploadedFile},
};
use axum::extract::Multipart;

/// Read the `title`, `caption` and `file` parts. Unknown parts are ignored;
/// validation is left to the workflow.
pub async fn read_draft_form(mut multipart: Multipart) -> Result<DraftUpload, AppError> {
    let mut upload = DraftUpload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("Multipart error: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("title") => {
                upload.title = field
                    .text()
                    .await
                    .map_err(|e| AppError::bad_request(format!("Failed to read title: {e}")))?;
            }
            Some("caption") => {
                upload.caption = field
                    .text()
                    .await
                    .map_err(|e| AppError::bad_request(format!("Failed to read caption: {e}")))?;
            }
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::bad_request(format!("Failed to read file: {e}")))?;
                upload.file = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            _ => {}
        }
    }

    Ok(upload)
}
