//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock fetcher injected, enabling full request/job/artifact testing
//! without yt-dlp or network access.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use streamsaver_core::{
    testing::MockFetcher, Config, Fetcher, JobOrchestrator, JobRegistry, OrchestratorConfig,
    StorageConfig,
};
use streamsaver_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use streamsaver_core::testing::fixtures;

/// Test fixture for E2E testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_start_download() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/start-download", json!({
///         "url": "https://example.com/v"
///     })).await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock fetcher - script output, files and outcomes
    pub fetcher: Arc<MockFetcher>,
    /// Job registry shared with the router
    pub registry: Arc<JobRegistry>,
    /// Public artifacts directory
    pub downloads_dir: PathBuf,
    /// Temporary directory holding downloads and work dirs
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub raw: Bytes,
}

impl TestFixture {
    /// Create a new test fixture with a default mock fetcher.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let downloads_dir = temp_dir.path().join("downloads");
        let work_dir = temp_dir.path().join("work");
        std::fs::create_dir_all(&downloads_dir).unwrap();

        let config = Config {
            storage: StorageConfig {
                downloads_dir: downloads_dir.clone(),
                work_dir,
            },
            ..Default::default()
        };

        let fetcher = Arc::new(MockFetcher::new());
        let registry = Arc::new(JobRegistry::new());
        let orchestrator = Arc::new(JobOrchestrator::new(
            OrchestratorConfig::from_config(&config),
            Arc::clone(&fetcher) as Arc<dyn Fetcher>,
            Arc::clone(&registry),
        ));

        let state = Arc::new(AppState::new(config, orchestrator));
        let router = create_router(state);

        Self {
            router,
            fetcher,
            registry,
            downloads_dir,
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

    /// Start a job and return its id.
    pub async fn start_job(&self, body: Value) -> String {
        let response = self.post("/start-download", body).await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        response.body["jobId"]
            .as_str()
            .expect("jobId should be a string")
            .to_string()
    }

    /// Poll `/status` until the job's status is no longer `processing`.
    pub async fn wait_for_terminal(&self, job_id: &str) -> Value {
        self.wait_for(job_id, |body| body["status"] != "processing")
            .await
    }

    /// Poll `/status` until `predicate` holds for the response body.
    pub async fn wait_for(&self, job_id: &str, predicate: impl Fn(&Value) -> bool) -> Value {
        let start = std::time::Instant::now();
        let path = format!("/status?jobId={}", job_id);

        while start.elapsed() < Duration::from_secs(5) {
            let response = self.get(&path).await;
            if response.status == StatusCode::OK && predicate(&response.body) {
                return response.body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("Timed out waiting on job {}: {:?}", job_id, self.get(&path).await.body);
    }

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
        let raw = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if raw.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&raw).unwrap_or(Value::Null)
        };

        TestResponse { status, body, raw }
    }
}
