//! Test-result upload endpoint: validation, name sanitization and storage.

use std::path::Path;

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::Multipart;
use tfia_core::write_bytes_atomic;

use super::types::{UploadRejection, UploadResponse};
use super::*;

const UPLOAD_FIELD_NAME: &str = "file";
const ALLOWED_UPLOAD_EXTENSIONS: &[&str] = &["csv", "xlsx", "xls"];
const FALLBACK_UPLOAD_NAME: &str = "upload";

pub(super) async fn handle_upload_test_file(
    State(state): State<Arc<ActionServerState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let Ok(mut multipart) = multipart else {
        return UploadRejection::MissingFilePart.into_response();
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return UploadRejection::MissingFilePart.into_response(),
            Err(error) => return multipart_error_response(error),
        };
        if field.name() != Some(UPLOAD_FIELD_NAME) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        if file_name.trim().is_empty() {
            return UploadRejection::EmptyFileName.into_response();
        }
        if !is_allowed_upload(&file_name) {
            return UploadRejection::InvalidFileType.into_response();
        }
        let content = match field.bytes().await {
            Ok(content) => content,
            Err(error) => return multipart_error_response(error),
        };

        let stored_name = format!(
            "{}_{}",
            state.next_upload_id(),
            sanitize_upload_file_name(&file_name)
        );
        let destination = state.config.upload_dir.join(stored_name);
        let write_target = destination.clone();
        let written = tokio::task::spawn_blocking(move || {
            write_bytes_atomic(&write_target, &content).map(|()| content.len())
        })
        .await;

        return match written {
            Ok(Ok(size)) => {
                info!(path = %destination.display(), bytes = size, "stored uploaded test file");
                (
                    StatusCode::OK,
                    Json(UploadResponse {
                        success: true,
                        message: "File uploaded successfully",
                        file_path: destination.display().to_string(),
                    }),
                )
                    .into_response()
            }
            Ok(Err(error)) => {
                warn!(path = %destination.display(), %error, "failed to store upload");
                ActionServerApiError::internal(format!("failed to store upload: {error:#}"))
                    .into_response()
            }
            Err(error) => ActionServerApiError::internal(format!("upload writer failed: {error}"))
                .into_response(),
        };
    }
}

fn multipart_error_response(error: MultipartError) -> Response {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ActionServerApiError::payload_too_large(error.body_text()).into_response()
    } else {
        ActionServerApiError::bad_request("malformed_multipart", error.body_text()).into_response()
    }
}

fn is_allowed_upload(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| {
            ALLOWED_UPLOAD_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str())
        })
        .unwrap_or(false)
}

/// Keeps the final path component, maps anything outside `[A-Za-z0-9._-]`
/// to `_`, and strips leading dots.
pub(super) fn sanitize_upload_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let sanitized = base
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect::<String>();
    let trimmed = sanitized.trim_start_matches('.');
    if trimmed.is_empty() {
        FALLBACK_UPLOAD_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}
