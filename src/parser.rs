//! External document parser contract.
//!
//! Layout analysis, OCR and table/chart detection live in a separate,
//! independently versioned component. This crate only knows it through
//! [`DocumentParser`]: give it a file, get a [`ParseResult`] back.
//!
//! The parser is an injected capability, checked when a parse is actually
//! requested. A process that was started without a parsing stack keeps
//! serving exports and answers parse requests with
//! [`ParserError::Unavailable`] instead of failing at start-up.

use crate::error::ParserError;
use crate::model::ParseResult;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// A component that turns a document on disk into a [`ParseResult`].
///
/// Implementations must be `Send + Sync`: transport layers share one parser
/// across concurrent requests.
pub trait DocumentParser: Send + Sync {
    /// Short identifier used in logs and error messages.
    fn name(&self) -> &str;

    /// Cheap readiness check, run before a request commits to parsing.
    fn ensure_available(&self) -> Result<(), ParserError> {
        Ok(())
    }

    /// Parse the document at `path`.
    fn parse_file(&self, path: &Path) -> Result<ParseResult, ParserError>;
}

/// Convenience alias for a shared parser.
pub type SharedParser = Arc<dyn DocumentParser>;

/// Stand-in used when no parsing stack is installed.
#[derive(Debug, Clone)]
pub struct UnavailableParser {
    reason: String,
}

impl UnavailableParser {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for UnavailableParser {
    fn default() -> Self {
        Self::new("no document parser is installed in this build")
    }
}

impl DocumentParser for UnavailableParser {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn ensure_available(&self) -> Result<(), ParserError> {
        Err(ParserError::Unavailable {
            reason: self.reason.clone(),
        })
    }

    fn parse_file(&self, _path: &Path) -> Result<ParseResult, ParserError> {
        Err(ParserError::Unavailable {
            reason: self.reason.clone(),
        })
    }
}

/// Parse an in-memory document.
///
/// Parsers want a path, so the bytes are staged in a [`tempfile`] named with
/// `suffix` (e.g. `".pdf"`). The file is deleted when this function returns,
/// whether parsing succeeded, failed or panicked.
pub fn parse_bytes(
    parser: &dyn DocumentParser,
    bytes: &[u8],
    suffix: &str,
) -> Result<ParseResult, ParserError> {
    parser.ensure_available()?;

    let mut tmp = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(suffix)
        .tempfile()
        .map_err(|source| ParserError::TempFile { source })?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.flush())
        .map_err(|source| ParserError::TempFile { source })?;

    debug!(
        parser = parser.name(),
        bytes = bytes.len(),
        path = %tmp.path().display(),
        "Staged document for parsing"
    );

    // `tmp` is dropped (and the file deleted) when this function returns
    let result = parser.parse_file(tmp.path())?;
    info!(
        parser = parser.name(),
        md_lines = result.md_lines.len(),
        html_lines = result.html_lines.len(),
        structured_items = result.structured_items.len(),
        images = result.images.len(),
        "Parsed document"
    );
    Ok(result)
}
