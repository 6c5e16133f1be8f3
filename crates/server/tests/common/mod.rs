//! Common test utilities for in-process API testing with mocks.
//!
//! This module provides a test fixture that builds the router around an
//! orchestrator whose fetcher and translator are mocks, so the whole HTTP
//! surface can be exercised without network access or pdf2zh.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use arxivist_core::{
    testing::{MockFetcher, MockTranslator},
    Config, ServerConfig, StorageConfig,
};
use arxivist_server::state::AppState;

/// Re-export fixtures for test convenience
pub use arxivist_core::testing::fixtures;

/// Test fixture for API testing with mock collaborators.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_enqueue() {
///     let fixture = TestFixture::new();
///
///     let response = fixture.post("/api/v1/tasks", json!({
///         "session_id": "s",
///         "paper_id": "2401.00001"
///     })).await;
///
///     assert_eq!(response.status, 202);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Shared state, for direct access to the orchestrator
    pub state: Arc<AppState>,
    /// Mock fetcher - inspect or fail downloads
    pub fetcher: Arc<MockFetcher>,
    /// Mock translator - inspect, delay or fail translations
    pub translator: Arc<MockTranslator>,
    /// Temporary data directory
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let fetcher = Arc::new(MockFetcher::new());
        let translator = Arc::new(MockTranslator::new());

        let mut config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            storage: StorageConfig {
                data_dir: temp_dir.path().to_path_buf(),
            },
            ..Default::default()
        };
        config.locks.poll_interval_ms = 10;
        config.events.keepalive_secs = 1;

        let state = Arc::new(AppState::from_config(
            config,
            Arc::clone(&fetcher) as Arc<dyn arxivist_core::Fetcher>,
            Arc::clone(&translator) as Arc<dyn arxivist_core::Translator>,
        ));
        let router = arxivist_server::api::create_router(Arc::clone(&state));

        Self {
            router,
            state,
            fetcher,
            translator,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Poll a task over the API until it is SUCCEEDED or FAILED.
    pub async fn wait_for_task(&self, task_id: &str) -> Value {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        loop {
            let response = self.get(&format!("/api/v1/tasks/{}", task_id)).await;
            assert_eq!(response.status, StatusCode::OK);
            let status = response.body["status"].as_str().unwrap_or_default().to_string();
            if status == "SUCCEEDED" || status == "FAILED" {
                return response.body;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "task {} still {} after 10s",
                task_id,
                status
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body_bytes).into_owned()))
        };

        TestResponse { status, body }
    }
}
