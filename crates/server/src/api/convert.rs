//! Upload-and-convert endpoint.

use axum::{
    body::Body,
    extract::{multipart::Field, Multipart, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::debug;
use transmute_core::ErrorKind;

use super::error::ApiError;
use crate::metrics::UPLOAD_BYTES;
use crate::state::AppState;

/// A parsed `multipart/form-data` conversion request.
#[derive(Debug, Default)]
struct ConvertForm {
    file_name: Option<String>,
    bytes: Option<Vec<u8>>,
    target_format: Option<String>,
}

/// Accepts fields `file` and `target_format` and responds with the
/// converted file as an attachment.
///
/// The output is streamed from disk; its working files are removed when the
/// body is dropped.
pub async fn convert_file(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = read_form(multipart).await?;

    let file_name = form
        .file_name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::invalid_request("No file provided"))?;
    let bytes = form.bytes.unwrap_or_default();
    let target_format = form
        .target_format
        .ok_or_else(|| ApiError::invalid_request("Missing target_format field"))?;
    debug!(file_name = %file_name, target_format = %target_format, size_bytes = bytes.len(), "Convert request parsed");

    let converted = state
        .service()
        .submit(&bytes, &file_name, &target_format)
        .await
        .map_err(|e| ApiError::from_service(&e, &state))?;

    let disposition = format!("attachment; filename=\"{}\"", converted.file_name());
    let converter = converted.converter().to_string();
    let reader = converted.open().await.map_err(|e| {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::IoFailure,
            format!("Failed to read converted file: {}", e.kind()),
        )
    })?;
    UPLOAD_BYTES
        .with_label_values(&[&converter])
        .observe(bytes.len() as f64);
    debug!(converter = %converter, output_bytes = reader.len(), "Streaming converted file");

    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
            (header::CONTENT_LENGTH, HeaderValue::from(reader.len())),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(ReaderStream::new(reader)),
    )
        .into_response())
}

async fn read_form(mut multipart: Multipart) -> Result<ConvertForm, ApiError> {
    let mut form = ConvertForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(multipart_error(e.status(), e.body_text())),
        };
        match field.name().unwrap_or("") {
            "file" => {
                form.file_name = field.file_name().map(|s| s.to_string());
                form.bytes = Some(read_bytes(field).await?);
            }
            "target_format" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e.status(), e.body_text()))?;
                form.target_format = Some(text);
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn read_bytes(field: Field<'_>) -> Result<Vec<u8>, ApiError> {
    field
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| multipart_error(e.status(), e.body_text()))
}

fn multipart_error(status: StatusCode, detail: String) -> ApiError {
    let status = if status.is_client_error() {
        status
    } else {
        StatusCode::BAD_REQUEST
    };
    ApiError::new(
        status,
        ErrorKind::InvalidRequest,
        format!("Failed to read upload: {}", detail),
    )
}
