use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

/// Structured error envelope for protocol-level request failures.
#[derive(Debug)]
pub(super) struct ActionServerApiError {
    pub(super) status: StatusCode,
    pub(super) code: &'static str,
    pub(super) message: String,
}

impl ActionServerApiError {
    pub(super) fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub(super) fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub(super) fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", message)
    }

    pub(super) fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }
}

impl IntoResponse for ActionServerApiError {
    fn into_response(self) -> Response {
        let error_type = if self.status.is_client_error() {
            "invalid_request_error"
        } else {
            "server_error"
        };
        (
            self.status,
            Json(json!({
                "error": {
                    "type": error_type,
                    "code": self.code,
                    "message": self.message,
                }
            })),
        )
            .into_response()
    }
}

/// Upload validation failures, reported as `{"error": <text>}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum UploadRejection {
    MissingFilePart,
    EmptyFileName,
    InvalidFileType,
}

impl UploadRejection {
    pub(super) fn as_str(self) -> &'static str {
        match self {
            Self::MissingFilePart => "No file part",
            Self::EmptyFileName => "No selected file",
            Self::InvalidFileType => "Invalid file type",
        }
    }
}

impl IntoResponse for UploadRejection {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": self.as_str() }))).into_response()
    }
}

#[derive(Debug, Serialize)]
pub(super) struct UploadResponse {
    pub(super) success: bool,
    pub(super) message: &'static str,
    pub(super) file_path: String,
}

#[derive(Debug, Serialize)]
pub(super) struct ActionListEntry {
    pub(super) name: String,
}

#[derive(Debug, Serialize)]
pub(super) struct HealthResponse {
    pub(super) status: &'static str,
}
