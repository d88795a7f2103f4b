//! Reference HTTP transport.
//!
//! A thin axum layer over the library: every route validates its input,
//! calls into [`crate::export`] or [`crate::parser`], and maps the outcome to
//! a status code. It adds no behaviour of its own.
//!
//! ```text
//! GET  /                                  service info
//! GET  /api/v1/health                     status + supported formats
//! POST /api/v1/export                     JSON payload + format → file
//! POST /api/v1/documents/parse            multipart PDF → JSON payload
//! POST /api/v1/documents/parse-and-export multipart PDF + format → file
//! ```
//!
//! Export and parse work is CPU-bound and runs on `spawn_blocking` so the
//! async workers keep serving other requests.

mod documents;
mod export;
mod health;
mod response;

pub use export::ExportRequest;
pub use health::{HealthData, ServiceInfo};
pub use response::{ApiError, ApiResponse};

use crate::config::ExportConfig;
use crate::parser::{SharedParser, UnavailableParser};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Default cap on request bodies (uploads and JSON payloads): 50 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub parser: SharedParser,
    pub config: Arc<ExportConfig>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(parser: SharedParser) -> Self {
        Self {
            parser,
            config: Arc::new(ExportConfig::default()),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_config(mut self, config: ExportConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }
}

impl Default for AppState {
    /// No parser installed: exports work, parse routes answer 503.
    fn default() -> Self {
        Self::new(Arc::new(UnavailableParser::default()))
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api: Router<AppState> = Router::new()
        .route("/health", get(health::health))
        .route("/export", post(export::export_content))
        .route("/documents/parse", post(documents::parse_document))
        .route("/documents/parse-and-export", post(documents::parse_and_export));

    Router::new()
        .route("/", get(health::root))
        .nest("/api/v1", api)
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
