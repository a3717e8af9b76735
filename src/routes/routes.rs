//! Defines all HTTP routes.
//!
//! ## Structure
//! - **Probes**: `GET /healthz`, `GET /readyz`
//! - **Page**
//!   - `GET  /` — form and draft list
//!   - `POST /` — create a draft from the form
//!   - `POST /drafts/{id}/delete` — delete a draft
//! - **JSON API**
//!   - `GET    /api/drafts` — list drafts, newest first
//!   - `POST   /api/drafts` — create a draft (multipart)
//!   - `DELETE /api/drafts/{id}` — delete a draft and its media
//! - **Public media**
//!   - `GET|HEAD /storage/v1/object/public/{bucket}/{*key}`

use crate::{
    handlers::{
        draft_handlers::{create_draft, delete_draft, list_drafts},
        health_handlers::{healthz, readyz},
        media_handlers::{get_public_object, head_public_object},
        page_handlers::{delete_from_page, index, submit_draft},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

/// Build the router. Request bodies above `max_upload_bytes` are rejected.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/", get(index).post(submit_draft))
        .route("/drafts/{id}/delete", post(delete_from_page))
        .route("/api/drafts", get(list_drafts).post(create_draft))
        .route("/api/drafts/{id}", delete(delete_draft))
        .route(
            "/storage/v1/object/public/{bucket}/{*key}",
            get(get_public_object).head(head_public_object),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
}
