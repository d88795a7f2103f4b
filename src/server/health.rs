use super::response::ApiResponse;
use crate::format::ExportFormat;
use axum::Json;
use serde::{Deserialize, Serialize};

/// Payload of `GET /api/v1/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthData {
    pub status: String,
    pub supported_export_formats: Vec<String>,
}

impl Default for HealthData {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            supported_export_formats: ExportFormat::names(),
        }
    }
}

/// Payload of `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub health: String,
}

pub(super) async fn health() -> Json<ApiResponse<HealthData>> {
    Json(ApiResponse::ok(HealthData::default()))
}

pub(super) async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "unstructured-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        health: "/api/v1/health".to_string(),
    })
}
