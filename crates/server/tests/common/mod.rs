//! Common test utilities for API testing.
//!
//! This module provides a test fixture that creates an in-process server
//! with a real working directory and either the built-in converters or a
//! mock converter, enabling end-to-end testing without external engines.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use transmute_core::{
    testing::MockConverter, Config, ConversionService, ConverterRegistry, EngineConfig, WorkDir,
};

/// Re-export fixtures for test convenience
pub use transmute_core::testing::fixtures;

const BOUNDARY: &str = "transmute-test-boundary";

/// Test fixture for in-process API testing.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_png_to_jpeg() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture
///         .convert("logo.png", &fixtures::opaque_png(8, 8, [0, 0, 255]), "jpeg")
///         .await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Temporary directory holding the working directory
    pub temp_dir: TempDir,
    /// Working directory root
    pub workdir: PathBuf,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
    pub body: Value,
}

impl TestFixture {
    /// Create a fixture with the built-in converters and every external
    /// engine pointed at a nonexistent binary.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a fixture whose only converter is `converter`.
    pub async fn with_converter(converter: Arc<MockConverter>) -> Self {
        Self::with_config(TestConfig {
            converter: Some(converter),
            ..Default::default()
        })
        .await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let workdir_path = temp_dir.path().join("work");

        let mut config = Config::default();
        config.server.host = std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST);
        config.server.max_upload_mb = test_config.max_upload_mb;
        config.workspace.temp_dir = workdir_path.clone();
        config.engines = missing_engines(temp_dir.path());

        let registry = match test_config.converter {
            Some(converter) => {
                let mut registry = ConverterRegistry::new();
                registry.register(converter);
                registry
            }
            None => ConverterRegistry::with_defaults(&config.engines),
        };

        let workdir = Arc::new(
            WorkDir::prepare(&workdir_path)
                .await
                .expect("Failed to prepare working directory"),
        );
        let service = ConversionService::new(
            Arc::new(registry),
            workdir,
            config.workspace.max_parallel_conversions,
        );

        let max_upload_bytes = config.server.max_upload_bytes();
        let state = Arc::new(transmute_server::AppState::new(config, service));
        let router = transmute_server::create_router(state, max_upload_bytes);

        Self {
            router,
            temp_dir,
            workdir: workdir_path,
        }
    }

    /// Names of the entries currently in the working directory.
    pub fn workdir_entries(&self) -> Vec<String> {
        fixtures::dir_entries(&self.workdir)
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Upload `bytes` as `file_name` and ask for `target`.
    pub async fn convert(&self, file_name: &str, bytes: &[u8], target: &str) -> TestResponse {
        self.post_convert(Some((file_name, bytes)), Some(target)).await
    }

    /// POST to the convert endpoint. `None` omits the field.
    pub async fn post_convert(
        &self,
        file: Option<(&str, &[u8])>,
        target: Option<&str>,
    ) -> TestResponse {
        self.send(convert_request(file, target)).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        let body: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            bytes,
            body,
        }
    }
}

/// Builds a multipart convert request. `None` omits the field.
pub fn convert_request(file: Option<(&str, &[u8])>, target: Option<&str>) -> Request<Body> {
    let mut body = Vec::new();
    if let Some((name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    if let Some(target) = target {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"target_format\"\r\n\r\n{target}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/v1/convert")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Register only this converter instead of the built-in ones
    pub converter: Option<Arc<MockConverter>>,
    /// Upload limit in megabytes
    pub max_upload_mb: usize,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            converter: None,
            max_upload_mb: 10,
        }
    }
}

/// Engine config whose external programs cannot be found.
fn missing_engines(dir: &Path) -> EngineConfig {
    let missing = dir.join("missing-bin");
    EngineConfig::default()
        .with_libreoffice(missing.join("soffice"))
        .with_ffmpeg(missing.join("ffmpeg"))
        .with_heif_decoders(missing.join("heif-convert"), missing.join("magick"))
        .with_pdf2docx(missing.join("pdf2docx"))
        .with_weasyprint(missing.join("weasyprint"))
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
