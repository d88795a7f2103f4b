use super::response::{attachment, run_export, ApiError};
use super::AppState;
use crate::format::ExportFormat;
use crate::payload::ExportPayload;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Body of `POST /api/v1/export`: a previous parse plus the target format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRequest {
    #[serde(flatten)]
    pub payload: ExportPayload,
    /// One of `markdown`, `html`, `excel`.
    pub format: String,
}

pub(super) async fn export_content(
    State(state): State<AppState>,
    Json(request): Json<ExportRequest>,
) -> Result<Response, ApiError> {
    let format: ExportFormat = request.format.parse()?;

    let (result, dropped) = request
        .payload
        .into_result_with_report(&state.config.default_image_mime);

    let exported = run_export(result, format, state.config.clone()).await?;
    info!(
        format = %format,
        bytes = exported.len(),
        dropped_images = dropped.len(),
        "Exported payload"
    );
    Ok(attachment(exported, "export"))
}
