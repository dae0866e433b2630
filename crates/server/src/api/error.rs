//! JSON error responses for the API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;
use transmute_core::{ErrorKind, ServiceError};

use crate::state::AppState;

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: ErrorKind,
}

/// An error ready to be sent to the client.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: message.into(),
                kind,
            },
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorKind::InvalidRequest, message)
    }

    /// Maps a service failure to 400 or 500 without leaking working paths.
    pub fn from_service(err: &ServiceError, state: &AppState) -> Self {
        let kind = err.kind();
        let status = if kind.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            error!(kind = %kind, error = %err, "Conversion request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::new(status, kind, err.public_message(state.workdir_root()))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn kind(&self) -> ErrorKind {
        self.body.kind
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
