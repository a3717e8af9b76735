#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{Method, Request, Response, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use post_drafts::routes::routes::routes;
use post_drafts::services::backend::{self, BackendClient, Credentials};
use post_drafts::state::AppState;

pub const BASE_URL: &str = "http://drafts.test";
pub const BUCKET: &str = "post-media";
const BOUNDARY: &str = "----post-drafts-test-boundary";

/// A router over an isolated SQLite file and storage root.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub bytes: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes).expect("response body is not JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// One part of a multipart form.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: Option<&'a str>,
        bytes: &'a [u8],
    },
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(Credentials::ServiceRole).await
    }

    pub async fn spawn_with(credentials: Credentials) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite://{}", dir.path().join("meta/drafts.db").display());
        let pool = backend::connect(&url).await.expect("connect sqlite");
        backend::run_migrations(&pool).await.expect("migrate");

        let storage_root = dir.path().join("objects");
        std::fs::create_dir_all(&storage_root).expect("storage root");

        let client = BackendClient::new(Arc::new(pool), storage_root, BASE_URL, credentials);
        let state = AppState::new(client, BUCKET).expect("app state");
        let router = routes(1024 * 1024).with_state(state.clone());

        Self {
            router,
            state,
            _dir: dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response: Response<Body> = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        TestResponse {
            status,
            headers,
            bytes,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(
            Request::builder()
                .method(Method::GET)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.send(
            Request::builder()
                .method(Method::DELETE)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_multipart(&self, uri: &str, parts: &[Part<'_>]) -> TestResponse {
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(multipart_body(parts)))
                .unwrap(),
        )
        .await
    }

    /// Create a draft through the JSON API.
    pub async fn create_draft(
        &self,
        title: &str,
        caption: &str,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> TestResponse {
        self.post_multipart(
            "/api/drafts",
            &[
                Part::Text("title", title),
                Part::Text("caption", caption),
                Part::File {
                    name: "file",
                    file_name,
                    content_type: Some(content_type),
                    bytes,
                },
            ],
        )
        .await
    }

    pub async fn list_drafts(&self) -> Vec<Value> {
        let res = self.get("/api/drafts").await;
        assert_eq!(res.status, StatusCode::OK);
        res.json().as_array().expect("draft array").clone()
    }
}

/// Path part of a public media URL, for requesting it through the router.
pub fn media_path(media_url: &str) -> &str {
    media_url
        .strip_prefix(BASE_URL)
        .expect("media url uses the test base url")
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n"
                    )
                    .as_bytes(),
                );
                if let Some(content_type) = content_type {
                    body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
                }
                body.extend_from_slice(b"\r\n");
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
