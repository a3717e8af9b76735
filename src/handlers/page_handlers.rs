//! Minimal server-rendered page: the create form above the draft list.
//!
//! Mutations redirect back to `/`, so the list is always re-read in full.

use crate::{
    errors::AppError, handlers::form::read_draft_form, models::draft::Draft, state::AppState,
};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};

/// `GET /`
pub async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let drafts = state.workflow.list().await?;
    Ok(Html(render_page(&drafts, None)))
}

/// `POST /` — create from the form, then back to the list.
pub async fn submit_draft(State(state): State<AppState>, multipart: Multipart) -> Response {
    let created = match read_draft_form(multipart).await {
        Ok(upload) => state
            .workflow
            .create(&upload)
            .await
            .map_err(AppError::from),
        Err(err) => Err(err),
    };

    match created {
        Ok(_) => Redirect::to("/").into_response(),
        Err(err) => render_error(&state, err).await,
    }
}

/// `POST /drafts/{id}/delete`
pub async fn delete_from_page(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.workflow.delete_by_id(id).await {
        Ok(()) => Redirect::to("/").into_response(),
        Err(err) => render_error(&state, err.into()).await,
    }
}

async fn render_error(state: &AppState, err: AppError) -> Response {
    let drafts = state.workflow.list().await.unwrap_or_default();
    (err.status, Html(render_page(&drafts, Some(&err.message)))).into_response()
}

fn render_page(drafts: &[Draft], error: Option<&str>) -> String {
    let mut html = String::from(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>Drafts</title></head><body>",
    );
    html.push_str("<h1>Create Post</h1>");
    if let Some(message) = error {
        html.push_str(&format!(
            "<p class=\"error\" role=\"alert\">{}</p>",
            html_escape(message)
        ));
    }
    html.push_str(concat!(
        r#"<form method="post" action="/" enctype="multipart/form-data">"#,
        r#"<input name="title" placeholder="Title" required>"#,
        r#"<textarea name="caption" placeholder="Caption" required></textarea>"#,
        r#"<input name="file" type="file" accept="image/*,video/*" required>"#,
        r#"<button type="submit">Create Post</button>"#,
        r#"</form><hr><h2>Your Posts</h2>"#
    ));

    for draft in drafts {
        let url = html_escape(&draft.media_url);
        html.push_str(&format!("<article id=\"draft-{}\">", draft.id));
        html.push_str(&format!("<h3>{}</h3>", html_escape(&draft.title)));
        html.push_str(&format!("<p>{}</p>", html_escape(&draft.caption)));
        if draft.is_video() {
            html.push_str(&format!("<video src=\"{}\" controls></video>", url));
        } else {
            html.push_str(&format!("<img src=\"{}\" alt=\"\">", url));
        }
        html.push_str(&format!(
            "<form method=\"post\" action=\"/drafts/{}/delete\"><button type=\"submit\">Delete</button></form>",
            draft.id
        ));
        html.push_str("</article>");
    }

    html.push_str("</body></html>");
    html
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
