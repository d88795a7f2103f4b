//! Export Dispatcher: Result Model + format identifier → bytes.
//!
//! This is the single entry point every consumer goes through (HTTP handler,
//! batch CLI, embedding application). It validates the format, hands the
//! relevant part of the [`ParseResult`] to exactly one exporter and returns
//! the bytes. It is a pure function of its inputs: no temporary files, no
//! network, no shared state, so any number of exports may run in parallel.

use crate::config::ExportConfig;
use crate::error::ExportError;
use crate::exporters::{html, markdown, spreadsheet};
use crate::format::{ExportFormat, Exported};
use crate::model::ParseResult;
use tracing::{debug, Level};

/// Export `result` in `format` with the default [`ExportConfig`].
///
/// `format` is matched case-insensitively with surrounding whitespace
/// ignored; it must be one of `markdown`, `html`, `excel`.
///
/// # Errors
/// - [`ExportError::UnsupportedFormat`] for any other value (there is no
///   default format)
/// - [`ExportError::SpreadsheetWriteFailed`] if the XLSX container cannot be
///   assembled
///
/// # Example
/// ```rust
/// use unstructured_export::{export, ParseResult};
///
/// let result = ParseResult {
///     md_lines: vec!["# Title".into(), "".into(), "Body text".into()],
///     ..ParseResult::default()
/// };
/// let bytes = export(&result, " Markdown ").unwrap();
/// assert_eq!(bytes, b"# Title\n\nBody text\n");
/// assert!(export(&result, "json").is_err());
/// ```
pub fn export(result: &ParseResult, format: &str) -> Result<Vec<u8>, ExportError> {
    export_with_config(result, format, &ExportConfig::default()).map(Exported::into_bytes)
}

/// Export with an explicit configuration, keeping the format metadata
/// (MIME type, extension) alongside the bytes.
pub fn export_with_config(
    result: &ParseResult,
    format: &str,
    config: &ExportConfig,
) -> Result<Exported, ExportError> {
    let format: ExportFormat = format.parse()?;
    export_as(result, format, config)
}

/// Export in an already-validated [`ExportFormat`].
pub fn export_as(
    result: &ParseResult,
    format: ExportFormat,
    config: &ExportConfig,
) -> Result<Exported, ExportError> {
    if tracing::enabled!(Level::DEBUG) {
        let dangling = dangling_for(result, format);
        if !dangling.is_empty() {
            debug!(
                count = dangling.len(),
                first = %dangling[0],
                "Image references without an Image Store entry will render as broken links"
            );
        }
    }

    let data = match format {
        ExportFormat::Markdown => markdown::render(&result.md_lines).into_bytes(),
        ExportFormat::Html => html::render(&result.html_lines, &result.images, config).into_bytes(),
        ExportFormat::Excel => spreadsheet::render(&result.structured_items)?,
    };

    debug!(format = %format, bytes = data.len(), "Export complete");
    Ok(Exported { data, format })
}

/// Dangling references in the representation `format` actually renders.
/// The spreadsheet carries no image references.
fn dangling_for(result: &ParseResult, format: ExportFormat) -> Vec<String> {
    match format {
        ExportFormat::Markdown => result.unresolved(result.markdown_image_references()),
        ExportFormat::Html => result.unresolved(result.html_image_references()),
        ExportFormat::Excel => Vec::new(),
    }
}
