//! JSON API for drafts. Every mutation answers with a fresh full listing.

use crate::{
    errors::AppError, handlers::form::read_draft_form, models::draft::Draft, state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CreateDraftResponse {
    pub media_url: String,
    pub drafts: Vec<Draft>,
}

#[derive(Debug, Serialize)]
pub struct DraftListResponse {
    pub drafts: Vec<Draft>,
}

/// `GET /api/drafts` — newest first.
pub async fn list_drafts(State(state): State<AppState>) -> Result<Json<Vec<Draft>>, AppError> {
    Ok(Json(state.workflow.list().await?))
}

/// `POST /api/drafts` — multipart `title`, `caption`, `file`.
pub async fn create_draft(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let upload = read_draft_form(multipart).await?;
    let media_url = state.workflow.create(&upload).await?;
    let drafts = state.workflow.list().await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateDraftResponse { media_url, drafts }),
    ))
}

/// `DELETE /api/drafts/{id}` — removes the draft and its media.
pub async fn delete_draft(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DraftListResponse>, AppError> {
    state.workflow.delete_by_id(id).await?;
    let drafts = state.workflow.list().await?;
    Ok(Json(DraftListResponse { drafts }))
}
