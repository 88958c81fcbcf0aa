//! Web server for the receipt upload form.
//!
//! One page: event name, event date and a multi-image picker. Submitting it
//! runs the intake and renders the summary (or the first error) below the
//! form.

mod assets;
mod handlers;
mod routes;
mod templates;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::services::IntakeService;

/// Largest accepted form submission.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub intake: Arc<IntakeService>,
}

impl AppState {
    pub fn new(intake: IntakeService) -> Self {
        Self {
            intake: Arc::new(intake),
        }
    }
}

/// Start the web server.
pub async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tempfile::tempdir;
    use tower::ServiceExt;

    use crate::storage::{LocalObjectStore, ObjectStore};

    const BOUNDARY: &str = "receipt-test-boundary";
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDRreceipt";

    fn setup_test_app() -> (axum::Router, Arc<LocalObjectStore>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = Arc::new(LocalObjectStore::new(dir.path()));
        let state = AppState::new(IntakeService::new(store.clone(), "new/"));
        (create_router(state), store, dir)
    }

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a [u8]),
    }

    fn multipart_body(parts: &[Part]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(name, filename, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                             Content-Type: application/octet-stream\r\n\r\n",
                            name, filename
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn post_event(parts: &[Part]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/events")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_form_page() {
        let (app, _store, _dir) = setup_test_app();

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("Simple Event Creator"));
        assert!(html.contains("name=\"event_name\""));
        assert!(html.contains("name=\"event_date\""));
        assert!(html.contains("multiple"));
    }

    #[tokio::test]
    async fn test_static_css() {
        let (app, _store, _dir) = setup_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/static/style.css")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get("content-type")
            .map(|v| v.to_str().unwrap_or(""));
        assert!(content_type.unwrap_or("").contains("css"));
    }

    #[tokio::test]
    async fn test_create_event_stores_files() {
        let (app, store, _dir) = setup_test_app();

        let response = app
            .oneshot(post_event(&[
                Part::Text("event_name", "Summer BBQ"),
                Part::Text("event_date", "2024-07-04"),
                Part::File("files", "one.png", PNG),
                Part::File("files", "two.png", PNG),
            ]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Event Created &amp; Files Uploaded Successfully!"));
        assert!(html.contains("Uploaded Files (2)"));
        assert!(html.contains("new/240704-summer-bbq-2.png"));

        let keys: Vec<String> = store
            .list("new/")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(
            keys,
            vec!["new/240704-summer-bbq-1.png", "new/240704-summer-bbq-2.png"]
        );
    }

    #[tokio::test]
    async fn test_create_event_bad_date() {
        let (app, store, _dir) = setup_test_app();

        let response = app
            .oneshot(post_event(&[
                Part::Text("event_name", "Summer BBQ"),
                Part::Text("event_date", "07/04/2024"),
                Part::File("files", "one.png", PNG),
            ]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let html = body_text(response).await;
        assert!(html.contains("Error: Invalid date format. Please use YYYY-MM-DD."));
        assert!(store.list("new/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_event_empty_file_input() {
        let (app, store, _dir) = setup_test_app();

        // Browsers send an empty part when no file was picked
        let response = app
            .oneshot(post_event(&[
                Part::Text("event_name", "Picnic"),
                Part::Text("event_date", "2025-01-02"),
                Part::File("files", "", b""),
            ]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let html = body_text(response).await;
        assert!(html.contains("Error: No files uploaded."));
        assert!(store.list("new/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_event_escapes_name() {
        let (app, _store, _dir) = setup_test_app();

        let response = app
            .oneshot(post_event(&[
                Part::Text("event_name", "<b>Gala</b>"),
                Part::Text("event_date", "2024-12-31"),
                Part::File("files", "a.png", PNG),
            ]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("&lt;b&gt;Gala&lt;/b&gt;"));
        assert!(html.contains("new/241231-bgalab-1.png"));
    }
}
