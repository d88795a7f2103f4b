//! HTTP service for unstructured-export.
//!
//! Serves the reference router from [`unstructured_export::server`]. This
//! build links no document parser, so the parse routes answer 503 while
//! `/api/v1/export` works normally. Applications that ship a parser build
//! their own `AppState` and reuse the router.

use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::net::SocketAddr;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use unstructured_export::server::{self, AppState, DEFAULT_MAX_UPLOAD_BYTES};
use unstructured_export::ExportConfig;

/// Parse and export API.
#[derive(Parser, Debug)]
#[command(name = "unstructured-api", version, about = "Parse PDFs and export to Markdown, HTML or Excel")]
struct Cli {
    /// Interface to bind.
    #[arg(long, env = "UNSTRUCTURED_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(short, long, env = "UNSTRUCTURED_PORT", default_value_t = 8000)]
    port: u16,

    /// Maximum request body size in bytes.
    #[arg(long, env = "UNSTRUCTURED_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    max_upload_bytes: usize,

    /// MIME type assumed for images sent as plain base64.
    #[arg(long, env = "UNSTRUCTURED_DEFAULT_IMAGE_MIME")]
    default_image_mime: Option<String>,

    /// `<title>` of generated HTML documents.
    #[arg(long, env = "UNSTRUCTURED_HTML_TITLE")]
    html_title: Option<String>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "UNSTRUCTURED_VERBOSE")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // `.env` first so clap's `env = ...` fallbacks can see it
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "unstructured_export=debug,tower_http=debug"
    } else {
        "unstructured_export=info,tower_http=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let mut builder = ExportConfig::builder();
    if let Some(ref mime) = cli.default_image_mime {
        builder = builder.default_image_mime(mime.clone());
    }
    if let Some(ref title) = cli.html_title {
        builder = builder.html_title(title.clone());
    }
    let config = builder.build().context("Invalid configuration")?;

    let state = AppState::default()
        .with_config(config)
        .with_max_upload_bytes(cli.max_upload_bytes);
    tracing::info!("Document parser: {}", state.parser.name());
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind((cli.host.as_str(), cli.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", cli.host, cli.port))?;
    let addr: SocketAddr = listener.local_addr().context("Listener has no local address")?;
    tracing::info!("unstructured-api v{} listening on {}", env!("CARGO_PKG_VERSION"), addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
