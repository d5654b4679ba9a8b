use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};

use crate::web::{AppState, api, auth, landing};

const ROBOTS_TXT_BODY: &str = "User-agent: *\nDisallow: /\n";

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config().max_request_bytes();

    Router::new()
        .route("/", get(landing::landing_page))
        .route("/login", post(auth::process_login))
        .route("/logout", post(auth::logout))
        .route("/healthz", get(healthz))
        .route("/robots.txt", get(robots_txt))
        .route("/api/state", get(api::get_state))
        .route("/api/selection", post(api::select_files))
        .route("/api/selection/reset", post(api::reset_selection))
        .route("/api/drag", post(api::drag))
        .route("/api/upload", post(api::start_upload))
        .route("/api/copy", post(api::copy_url))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

async fn robots_txt() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        ROBOTS_TXT_BODY,
    )
}

async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use axum::{
        body::Body,
        http::{HeaderValue, Request, Response},
    };
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tokio::time::{sleep, timeout};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        clipboard::testing::RecordingClipboard,
        config::AppConfig,
        session::SessionStore,
        store::testing::{ScriptStep, ScriptedStore},
        web::auth::SESSION_COOKIE,
    };

    const PASSWORD: &str = "letmein";
    const BOUNDARY: &str = "gate-test-boundary";

    struct Harness {
        app: Router,
        store: Arc<ScriptedStore>,
        clipboard: Arc<RecordingClipboard>,
        sessions: SessionStore,
        cookie: Option<String>,
    }

    impl Harness {
        fn new(store: ScriptedStore) -> Self {
            Self::with_clipboard(store, RecordingClipboard::default())
        }

        fn with_clipboard(store: ScriptedStore, clipboard: RecordingClipboard) -> Self {
            let config = AppConfig::from_lookup(|key: &str| match key {
                "ADMIN_PASSWORD" => Some(PASSWORD.to_string()),
                "UPLOAD_PRESET" => Some("preset".to_string()),
                "CLOUD_ACCOUNT_ID" => Some("demo".to_string()),
                "MAX_IMAGES" => Some("3".to_string()),
                _ => None,
            })
            .unwrap();
            let store = Arc::new(store);
            let clipboard = Arc::new(clipboard);
            let state = AppState::with_backends(config, store.clone(), clipboard.clone());
            let sessions = state.sessions().clone();

            Self {
                app: build_router(state),
                store,
                clipboard,
                sessions,
                cookie: None,
            }
        }

        async fn send(&mut self, mut request: Request<Body>) -> Response<Body> {
            if let Some(cookie) = &self.cookie {
                request
                    .headers_mut()
                    .insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
            }

            let response = self.app.clone().oneshot(request).await.unwrap();

            if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
                let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
                assert!(pair.starts_with(SESSION_COOKIE));
                self.cookie = Some(pair.to_string());
            }

            response
        }

        async fn get_page(&mut self) -> String {
            let response = self.send(get_request("/")).await;
            assert_eq!(response.status(), StatusCode::OK);
            body_text(response).await
        }

        async fn login(&mut self, password: &str) {
            let request = Request::builder()
                .method("POST")
                .uri("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(format!("password={password}")))
                .unwrap();
            let response = self.send(request).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
        }

        async fn logout(&mut self) {
            let request = Request::builder()
                .method("POST")
                .uri("/logout")
                .body(Body::empty())
                .unwrap();
            let response = self.send(request).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
        }

        async fn api(&mut self, request: Request<Body>) -> (StatusCode, Value) {
            let response = self.send(request).await;
            let status = response.status();
            let body = body_text(response).await;
            (status, serde_json::from_str(&body).unwrap())
        }

        async fn select(&mut self, source: &str, files: &[(&str, &str)]) -> (StatusCode, Value) {
            let mut body = Vec::new();
            for (name, content_type) in files {
                body.extend_from_slice(
                    format!(
                        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"not really an image");
                body.extend_from_slice(b"\r\n");
            }
            body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

            let request = Request::builder()
                .method("POST")
                .uri(format!("/api/selection?source={source}"))
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap();
            self.api(request).await
        }

        async fn post_empty(&mut self, uri: &str) -> (StatusCode, Value) {
            let request = Request::builder()
                .method("POST")
                .uri(uri)
                .body(Body::empty())
                .unwrap();
            self.api(request).await
        }

        async fn post_json(&mut self, uri: &str, payload: Value) -> (StatusCode, Value) {
            let request = Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap();
            self.api(request).await
        }

        async fn state(&mut self) -> (StatusCode, Value) {
            self.api(get_request("/api/state")).await
        }
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response<Body>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn names(values: &Value, key: &str, field: &str) -> Vec<String> {
        values[key]
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry[field].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn healthz_responds_ok() {
        let mut harness = Harness::new(ScriptedStore::default());
        let response = harness.send(get_request("/healthz")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn visits_without_login_create_no_session() {
        let mut harness = Harness::new(ScriptedStore::default());
        let page = harness.get_page().await;
        assert!(page.contains("Please Login"));
        assert!(!page.contains("Incorrect Password!"));

        harness.get_page().await;
        harness.state().await;
        assert!(harness.cookie.is_none());
        assert_eq!(harness.sessions.len().await, 0);

        harness.cookie = Some(format!("{SESSION_COOKIE}={}", uuid::Uuid::new_v4()));
        assert!(harness.get_page().await.contains("Please Login"));
        assert_eq!(harness.sessions.len().await, 0);

        harness.cookie = None;
        harness.login("nope").await;
        assert!(harness.cookie.is_some());
        assert_eq!(harness.sessions.len().await, 1);
    }

    #[tokio::test]
    async fn wrong_wrong_right_password() {
        let mut harness = Harness::new(ScriptedStore::default());
        harness.get_page().await;

        harness.login("nope").await;
        let page = harness.get_page().await;
        assert!(page.contains("Please Login"));
        assert!(page.contains("Incorrect Password!"));

        harness.login("still-wrong").await;
        assert!(harness.get_page().await.contains("Incorrect Password!"));

        harness.login(PASSWORD).await;
        let page = harness.get_page().await;
        assert!(page.contains("Generate Image URL"));
        assert!(page.contains("Login Successful!"));
    }

    #[tokio::test]
    async fn api_rejects_closed_gate() {
        let mut harness = Harness::new(ScriptedStore::default());
        let (status, body) = harness.state().await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Please log in first");

        harness.get_page().await;
        harness.login("wrong").await;
        let (status, _) = harness.post_empty("/api/upload").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(harness.store.calls().is_empty());
    }

    #[tokio::test]
    async fn select_upload_and_copy() {
        let mut harness = Harness::new(ScriptedStore::succeeding(&[
            "https://cdn.test/a.png",
            "https://cdn.test/b.jpg",
        ]));
        harness.login(PASSWORD).await;

        let (status, body) = harness
            .select(
                "picker",
                &[
                    ("a.png", "image/png"),
                    ("notes.txt", "text/plain"),
                    ("b.jpg", "image/jpeg"),
                ],
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "selecting");
        assert_eq!(names(&body, "staged", "name"), vec!["a.png", "b.jpg"]);
        assert_eq!(body["can_upload"], true);

        let (status, body) = harness.post_empty("/api/upload").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "done");
        assert_eq!(
            names(&body, "results", "url"),
            vec!["https://cdn.test/a.png", "https://cdn.test/b.jpg"]
        );
        assert!(body["staged"].as_array().unwrap().is_empty());
        assert_eq!(harness.store.calls(), vec!["a.png", "b.jpg"]);

        let (status, body) = harness
            .post_json("/api/copy", json!({ "url": "https://cdn.test/b.jpg" }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["copy_status"], "copied");
        assert_eq!(body["copy_message"], "Copied!");
        assert_eq!(harness.clipboard.writes(), vec!["https://cdn.test/b.jpg"]);
    }

    #[tokio::test]
    async fn copy_only_accepts_published_urls() {
        let mut harness = Harness::new(ScriptedStore::default());
        harness.login(PASSWORD).await;

        let (status, body) = harness
            .post_json("/api/copy", json!({ "url": "https://evil.test/x" }))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Unknown result URL");
        assert!(harness.clipboard.writes().is_empty());
    }

    #[tokio::test]
    async fn clipboard_failure_is_reported_in_snapshot() {
        let mut harness = Harness::with_clipboard(
            ScriptedStore::succeeding(&["https://cdn.test/a.png"]),
            RecordingClipboard::failing(),
        );
        harness.login(PASSWORD).await;
        harness.select("picker", &[("a.png", "image/png")]).await;
        harness.post_empty("/api/upload").await;

        let (status, body) = harness
            .post_json("/api/copy", json!({ "url": "https://cdn.test/a.png" }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["copy_status"], "failed");
        assert_eq!(body["copy_message"], "Failed to copy");
    }

    #[tokio::test]
    async fn too_many_images_are_rejected_whole() {
        let mut harness = Harness::new(ScriptedStore::default());
        harness.login(PASSWORD).await;

        let (status, body) = harness
            .select(
                "picker",
                &[
                    ("1.png", "image/png"),
                    ("2.png", "image/png"),
                    ("3.png", "image/png"),
                    ("4.png", "image/png"),
                ],
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["staged"].as_array().unwrap().is_empty());
        assert_eq!(
            body["error"],
            "You can upload up to 3 images at a time (4 selected)"
        );
    }

    #[tokio::test]
    async fn drop_without_images_uses_drop_wording() {
        let mut harness = Harness::new(ScriptedStore::default());
        harness.login(PASSWORD).await;

        let (status, body) = harness.post_json("/api/drag", json!({ "event": "enter" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["drag_active"], true);

        let (status, body) = harness.select("drop", &[("a.txt", "text/plain")]).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Please drop an image file");
        assert_eq!(body["drag_active"], false);
    }

    #[tokio::test]
    async fn failed_transfer_publishes_nothing() {
        let mut harness = Harness::new(ScriptedStore::new(vec![
            ScriptStep::Url("https://cdn.test/first.png".to_string()),
            ScriptStep::Status(StatusCode::INTERNAL_SERVER_ERROR),
        ]));
        harness.login(PASSWORD).await;
        harness
            .select("picker", &[("first.png", "image/png"), ("second.png", "image/png")])
            .await;

        let (status, body) = harness.post_empty("/api/upload").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["status"], "failed");
        assert!(body["results"].as_array().unwrap().is_empty());
        assert!(body["staged"].as_array().unwrap().is_empty());
        assert_eq!(body["error"], "Error uploading image. Please try again.");
    }

    #[tokio::test]
    async fn dropped_upload_request_still_completes_batch() {
        let mut harness = Harness::new(
            ScriptedStore::succeeding(&["https://cdn.test/a.png"])
                .with_delay(Duration::from_millis(200)),
        );
        harness.login(PASSWORD).await;
        harness.select("picker", &[("a.png", "image/png")]).await;

        let dropped = timeout(Duration::from_millis(50), harness.post_empty("/api/upload")).await;
        assert!(dropped.is_err());

        let mut body = Value::Null;
        for _ in 0..50 {
            let (status, state) = harness.state().await;
            assert_eq!(status, StatusCode::OK);
            body = state;
            if body["status"] != "uploading" {
                break;
            }
            sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(body["status"], "done");
        assert_eq!(names(&body, "results", "url"), vec!["https://cdn.test/a.png"]);
        assert!(body["in_flight"].as_array().unwrap().is_empty());

        let (status, body) = harness.select("picker", &[("b.png", "image/png")]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["can_upload"], true);
    }

    #[tokio::test]
    async fn upload_without_selection_is_refused() {
        let mut harness = Harness::new(ScriptedStore::default());
        harness.login(PASSWORD).await;

        let (status, body) = harness.post_empty("/api/upload").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Please select an image first");
        assert!(harness.store.calls().is_empty());
    }

    #[tokio::test]
    async fn reset_keeps_published_results() {
        let mut harness = Harness::new(ScriptedStore::succeeding(&["https://cdn.test/a.png"]));
        harness.login(PASSWORD).await;
        harness.select("picker", &[("a.png", "image/png")]).await;
        harness.post_empty("/api/upload").await;
        harness.select("picker", &[("b.png", "image/png")]).await;

        let (status, body) = harness.post_empty("/api/selection/reset").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["staged"].as_array().unwrap().is_empty());
        assert_eq!(names(&body, "results", "url"), vec!["https://cdn.test/a.png"]);
    }

    #[tokio::test]
    async fn logout_closes_gate_and_resets_workflow() {
        let mut harness = Harness::new(ScriptedStore::succeeding(&["https://cdn.test/a.png"]));
        harness.login(PASSWORD).await;
        harness.select("picker", &[("a.png", "image/png")]).await;
        harness.post_empty("/api/upload").await;

        harness.logout().await;
        let (status, _) = harness.state().await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let page = harness.get_page().await;
        assert!(page.contains("Please Login"));
        assert!(!page.contains("Login Successful!"));

        harness.login(PASSWORD).await;
        let (status, body) = harness.state().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "idle");
        assert!(body["results"].as_array().unwrap().is_empty());
    }
}
