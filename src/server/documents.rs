//! Upload routes: parse a PDF, optionally export it in the same request.

use super::response::{attachment, run_export, upload_stem, ApiError, ApiResponse};
use super::AppState;
use crate::format::ExportFormat;
use crate::model::ParseResult;
use crate::parser::parse_bytes;
use crate::payload::ExportPayload;
use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::response::Response;
use axum::Json;
use std::sync::Arc;
use tracing::{debug, info};

const DEFAULT_FORMAT: &str = "html";

/// Fields of a multipart upload we care about.
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<(String, Bytes)>,
    format: Option<String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or("").to_string();
            debug!(
                "Received field: name='{}', filename={:?}",
                name,
                field.file_name()
            );
            match name.as_str() {
                "file" => {
                    let file_name = field.file_name().unwrap_or("").to_string();
                    let data = field.bytes().await?;
                    form.file = Some((file_name, data));
                }
                "format" => form.format = Some(field.text().await?),
                _ => {}
            }
        }
        Ok(form)
    }

    /// The uploaded PDF, or 400 for a missing file or a non-PDF name.
    fn pdf(&mut self) -> Result<(String, Bytes), ApiError> {
        match self.file.take() {
            Some((name, data)) if name.to_lowercase().ends_with(".pdf") => Ok((name, data)),
            Some(_) => Err(ApiError::BadRequest("Only PDF files are supported".into())),
            None => Err(ApiError::BadRequest(
                "No file provided. Use multipart field 'file'".into(),
            )),
        }
    }
}

async fn run_parse(state: &AppState, data: Bytes) -> Result<ParseResult, ApiError> {
    // Unavailability is a 503 before any bytes are staged
    state.parser.ensure_available()?;
    let parser = Arc::clone(&state.parser);
    tokio::task::spawn_blocking(move || parse_bytes(parser.as_ref(), &data, ".pdf"))
        .await
        .map_err(|e| ApiError::Internal(format!("Parse task failed: {e}")))?
        .map_err(ApiError::from)
}

/// `POST /api/v1/documents/parse`: PDF in, JSON payload with base64 images out.
pub(super) async fn parse_document(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<ExportPayload>>, ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let (file_name, data) = form.pdf()?;

    let result = run_parse(&state, data).await?;
    info!("Parsed upload '{}'", file_name);
    Ok(Json(ApiResponse::ok(ExportPayload::from_result(&result))))
}

/// `POST /api/v1/documents/parse-and-export`: PDF + format in, file out.
pub(super) async fn parse_and_export(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let (file_name, data) = form.pdf()?;
    let format: ExportFormat = form.format.as_deref().unwrap_or(DEFAULT_FORMAT).parse()?;

    let result = run_parse(&state, data).await?;
    let exported = run_export(result, format, state.config.clone()).await?;
    info!(
        format = %format,
        bytes = exported.len(),
        "Parsed and exported upload '{}'",
        file_name
    );
    Ok(attachment(exported, &upload_stem(&file_name)))
}
