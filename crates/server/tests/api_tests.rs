//! End-to-end API tests.
//!
//! These tests run the full router in-process against a real working
//! directory. External engines are pointed at nonexistent binaries, so
//! only the in-process image routines can succeed with the built-in
//! converters; the rest of the flows use a mock converter.

mod common;

use axum::http::{header, StatusCode};
use http_body_util::BodyExt;
use std::sync::Arc;
use transmute_core::testing::{MockConverter, MockOutput};
use tower::ServiceExt;
use transmute_core::ConverterError;

use common::{convert_request, fixtures, TestConfig, TestFixture};

// =============================================================================
// Basic API Tests
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/health").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_config_endpoint_hides_paths() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/config").await;
    assert_status!(response, StatusCode::OK);

    assert_eq!(response.body["server"]["max_upload_mb"], 10);
    assert_eq!(response.body["workspace"]["max_parallel_conversions"], 4);
    assert_eq!(response.body["engines"]["jpeg_quality"], 95);

    let raw = String::from_utf8(response.bytes).unwrap();
    assert!(!raw.contains(fixture.temp_dir.path().to_str().unwrap()));
    assert!(!raw.contains("ffmpeg_path"));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    fixture.get("/api/v1/health").await;

    let response = fixture.get("/metrics").await;
    assert_status!(response, StatusCode::OK);
    let text = String::from_utf8(response.bytes).unwrap();
    assert!(text.contains("transmute_http_requests_total"));
    assert!(text.contains("transmute_conversion_permits_available"));
}

// =============================================================================
// Format Discovery Tests
// =============================================================================

#[tokio::test]
async fn test_list_all_formats() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/formats").await;
    assert_status!(response, StatusCode::OK);

    let inputs: Vec<&str> = response.body["input"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    let outputs: Vec<&str> = response.body["output"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();

    assert_eq!(&inputs[..3], &["jpg", "jpeg", "png"]);
    assert!(inputs.contains(&"svg"));
    assert!(inputs.contains(&"md"));
    assert!(inputs.contains(&"webm"));
    assert!(outputs.contains(&"docx"));
    assert!(!outputs.contains(&"svg"));
}

#[tokio::test]
async fn test_list_targets_normalizes_input() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/formats/PNG").await;
    assert_status!(response, StatusCode::OK);

    assert_eq!(response.body["input_format"], "png");
    let targets = response.body["available_formats"].as_array().unwrap();
    assert!(targets.iter().any(|t| t == "jpg"));
    assert!(targets.iter().all(|t| t != "png"));
}

#[tokio::test]
async fn test_list_targets_unknown_format() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/formats/exe").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["available_formats"], serde_json::json!([]));
}

// =============================================================================
// Conversion Tests
// =============================================================================

#[tokio::test]
async fn test_convert_png_to_jpeg() {
    let fixture = TestFixture::new().await;
    let png = fixtures::translucent_png(20, 10);

    let response = fixture.convert("logo.png", &png, "JPEG").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(
        response.headers[header::CONTENT_TYPE],
        "application/octet-stream"
    );
    assert_eq!(
        response.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"converted_logo.jpeg\""
    );

    let decoded =
        image::load_from_memory_with_format(&response.bytes, image::ImageFormat::Jpeg).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (20, 10));
    assert!(fixture.workdir_entries().is_empty());
}

#[tokio::test]
async fn test_convert_unsupported_pair() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .convert("notes.txt", b"plain text", "webp")
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["kind"], "unsupported_format_pair");
    assert_eq!(
        response.body["error"],
        "Conversion from 'txt' to 'webp' is not supported"
    );
    assert!(fixture.workdir_entries().is_empty());
}

#[tokio::test]
async fn test_convert_missing_file() {
    let fixture = TestFixture::new().await;
    let response = fixture.post_convert(None, Some("pdf")).await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["kind"], "invalid_request");
}

#[tokio::test]
async fn test_convert_missing_target_format() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .post_convert(Some(("notes.txt", b"hello".as_slice())), None)
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["kind"], "invalid_request");
}

#[tokio::test]
async fn test_convert_file_without_extension() {
    let fixture = TestFixture::new().await;
    let response = fixture.convert("README", b"hello", "pdf").await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["kind"], "invalid_request");
    assert!(fixture.workdir_entries().is_empty());
}

#[tokio::test]
async fn test_convert_engine_not_installed() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .convert("report.docx", b"PK\x03\x04", "pdf")
        .await;
    assert_status!(response, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["kind"], "engine_not_installed");
    assert_eq!(
        response.body["error"],
        "DOCX to PDF requires Microsoft Word or LibreOffice to be installed. \
         Install Microsoft Office (Windows only). Install LibreOffice."
    );
    assert!(fixture.workdir_entries().is_empty());
}

#[tokio::test]
async fn test_convert_output_missing() {
    let mock = Arc::new(MockConverter::new());
    mock.set_output(MockOutput::Nothing).await;
    let fixture = TestFixture::with_converter(mock.clone()).await;

    let response = fixture.convert("notes.txt", b"hello", "pdf").await;
    assert_status!(response, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["kind"], "output_missing");
    assert_eq!(mock.conversion_count().await, 1);
    assert!(fixture.workdir_entries().is_empty());
}

#[tokio::test]
async fn test_convert_engine_failure_does_not_leak_paths() {
    let mock = Arc::new(MockConverter::new());
    let fixture = TestFixture::with_converter(mock.clone()).await;
    let leaked = fixture.workdir.join("abc_notes.txt");
    mock.set_next_error(ConverterError::engine_failed(
        "LibreOffice",
        format!("source file could not be loaded: {}", leaked.display()),
        None,
    ))
    .await;

    let response = fixture.convert("notes.txt", b"hello", "pdf").await;
    assert_status!(response, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["kind"], "engine_execution_failed");

    let message = response.body["error"].as_str().unwrap();
    assert!(message.starts_with("LibreOffice failed: source file could not be loaded"));
    assert!(!message.contains(fixture.workdir.to_str().unwrap()));
    assert!(fixture.workdir_entries().is_empty());
}

#[tokio::test]
async fn test_convert_with_mock_returns_bytes() {
    let mock = Arc::new(MockConverter::named("stub", &["txt"], &["pdf"]));
    mock.set_output(MockOutput::Bytes(b"%PDF-1.7".to_vec())).await;
    let fixture = TestFixture::with_converter(mock.clone()).await;

    let response = fixture
        .convert("my notes.txt", b"hello", ".pdf")
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.bytes, b"%PDF-1.7");
    assert_eq!(
        response.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"converted_my_notes.pdf\""
    );

    let calls = mock.recorded_conversions().await;
    assert!(calls[0].input_existed);
    assert!(fixture.workdir_entries().is_empty());
}

#[tokio::test]
async fn test_convert_streams_output_larger_than_upload_limit() {
    let output: Vec<u8> = (0..3 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
    let mock = Arc::new(MockConverter::named("stub", &["mp3"], &["wav"]));
    mock.set_output(MockOutput::Bytes(output.clone())).await;
    let fixture = TestFixture::with_config(TestConfig {
        converter: Some(mock),
        max_upload_mb: 1,
    })
    .await;

    let response = fixture
        .router
        .clone()
        .oneshot(convert_request(Some(("song.mp3", b"ID3")), Some("wav")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_LENGTH],
        output.len().to_string().as_str()
    );

    // Working files stay until the body has been consumed.
    assert_eq!(fixture.workdir_entries().len(), 2);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.len(), output.len());
    assert!(body[..] == output[..]);
    assert!(fixture.workdir_entries().is_empty());
}

#[tokio::test]
async fn test_convert_rejects_oversized_upload() {
    let fixture = TestFixture::with_config(TestConfig {
        max_upload_mb: 1,
        ..Default::default()
    })
    .await;

    let big = vec![0u8; 2 * 1024 * 1024];
    let response = fixture.convert("big.png", &big, "jpg").await;
    assert!(response.status.is_client_error(), "got {}", response.status);
    assert!(fixture.workdir_entries().is_empty());
}
