//! Response envelope, error mapping and file responses.

use crate::config::ExportConfig;
use crate::error::{ExportError, ParserError};
use crate::export::export_as;
use crate::format::{ExportFormat, Exported};
use crate::model::ParseResult;
use axum::extract::multipart::MultipartError;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

// ── Envelope ─────────────────────────────────────────────────────────────

/// Standard JSON envelope for every non-file response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

// ── Errors ───────────────────────────────────────────────────────────────

/// Everything a handler can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Parser(#[from] ParserError),

    #[error("Failed to read upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Export(ExportError::UnsupportedFormat { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Parser(ParserError::Unavailable { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Parser(ParserError::InvalidInput { .. } | ParserError::Failed { .. }) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Parser(ParserError::TempFile { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Multipart(e) => e.status(),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected ({}): {}", status.as_u16(), self);
        }
        (status, Json(ApiResponse::<()>::failure(self.to_string()))).into_response()
    }
}

// ── Files ────────────────────────────────────────────────────────────────

/// Run an export off the async workers.
pub(crate) async fn run_export(
    result: ParseResult,
    format: ExportFormat,
    config: Arc<ExportConfig>,
) -> Result<Exported, ApiError> {
    tokio::task::spawn_blocking(move || export_as(&result, format, &config))
        .await
        .map_err(|e| ApiError::Internal(format!("Export task failed: {e}")))?
        .map_err(ApiError::from)
}

/// Raw file bytes with the format's MIME type, offered as a download named
/// `<stem>.<ext>`.
pub(crate) fn attachment(exported: Exported, stem: &str) -> Response {
    let content_type = exported.mime_type().to_string();
    let disposition = format!(
        "attachment; filename=\"{}\"",
        exported.file_name(&sanitize_stem(stem))
    );
    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        exported.into_bytes(),
    )
        .into_response()
}

/// Upload name without directory or final extension, safe inside a quoted
/// header parameter.
pub(crate) fn upload_stem(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let stem = base.rsplit_once('.').map_or(base, |(stem, _)| stem);
    sanitize_stem(stem)
}

fn sanitize_stem(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .map(|c| match c {
            '"' | '\\' | '/' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_drops_directory_and_extension() {
        assert_eq!(upload_stem("report.pdf"), "report");
        assert_eq!(upload_stem("C:\\scans\\q3.final.PDF"), "q3.final");
        assert_eq!(upload_stem("dir/sub/x.pdf"), "x");
        assert_eq!(upload_stem(".pdf"), "document");
    }

    #[test]
    fn stem_is_header_safe() {
        assert_eq!(upload_stem("a\"b\r\n.pdf"), "a_b__");
    }

    #[test]
    fn status_mapping() {
        let unavailable = ApiError::from(ParserError::Unavailable { reason: "x".into() });
        assert_eq!(unavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let failed = ApiError::from(ParserError::Failed {
            parser: "p".into(),
            detail: "d".into(),
        });
        assert_eq!(failed.status_code(), StatusCode::BAD_REQUEST);

        let unsupported = ApiError::from("json".parse::<ExportFormat>().unwrap_err());
        assert_eq!(unsupported.status_code(), StatusCode::BAD_REQUEST);

        let temp = ApiError::from(ParserError::TempFile {
            source: std::io::Error::other("disk full"),
        });
        assert_eq!(temp.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn envelope_shape() {
        let json = serde_json::to_value(ApiResponse::<()>::failure("nope")).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "data": null, "error": "nope"}));
    }
}
