//! Error types for the unstructured-export library.
//!
//! Three distinct error types reflect three distinct failure modes:
//!
//! * [`ExportError`] (**fatal**): the requested export cannot be produced at
//!   all (unknown format, the spreadsheet container could not be assembled).
//!   Returned as `Err(ExportError)` from the `export*` functions.
//!
//! * [`ImageDecodeError`] (**non-fatal**): a single image entry of a
//!   reconstructed payload could not be decoded. The entry is dropped and the
//!   rest of the [`crate::model::ParseResult`] is still built, so a caller
//!   gets partial availability rather than losing the whole document to one
//!   bad blob.
//!
//! * [`ParserError`]: raised by the external document parser behind
//!   [`crate::parser::DocumentParser`]. Opaque to the export core; transport
//!   layers translate it into a service-unavailable or bad-input response.

use thiserror::Error;

/// All fatal errors returned by the export pipeline.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The requested format is not one of the accepted identifiers.
    #[error("Unsupported export format: '{format}'. Use one of: {accepted}")]
    UnsupportedFormat { format: String, accepted: String },

    /// The ZIP container of the XLSX workbook could not be written.
    #[error("Failed to assemble spreadsheet: {detail}")]
    SpreadsheetWriteFailed { detail: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A non-fatal error for a single image entry during reconstruction.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ImageDecodeError {
    /// The value is not valid standard base64.
    #[error("Image '{key}': invalid base64 payload: {detail}")]
    InvalidBase64 { key: String, detail: String },

    /// The value starts with `data:` but is not a base64 data URI.
    #[error("Image '{key}': malformed data URI")]
    MalformedDataUri { key: String },
}

impl ImageDecodeError {
    /// Relative-path key of the dropped entry.
    pub fn key(&self) -> &str {
        match self {
            ImageDecodeError::InvalidBase64 { key, .. } => key,
            ImageDecodeError::MalformedDataUri { key } => key,
        }
    }
}

/// Errors surfaced by the external document parser.
#[derive(Debug, Error)]
pub enum ParserError {
    /// No parsing stack is installed or it failed to initialise.
    #[error("Parser not available: {reason}")]
    Unavailable { reason: String },

    /// The uploaded document was rejected before or during parsing.
    #[error("Invalid input document: {detail}")]
    InvalidInput { detail: String },

    /// The parser ran but could not produce a result.
    #[error("Parser '{parser}' failed: {detail}")]
    Failed { parser: String, detail: String },

    /// The temporary file handed to the parser could not be created or written.
    #[error("Failed to stage document for parsing: {source}")]
    TempFile {
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_format_display() {
        let e = ExportError::UnsupportedFormat {
            format: "json".into(),
            accepted: "markdown, html, excel".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("'json'"), "got: {msg}");
        assert!(msg.contains("markdown, html, excel"), "got: {msg}");
    }

    #[test]
    fn image_decode_error_key() {
        let e = ImageDecodeError::InvalidBase64 {
            key: "images/p1.png".into(),
            detail: "Invalid padding".into(),
        };
        assert_eq!(e.key(), "images/p1.png");
        assert!(e.to_string().contains("images/p1.png"));

        let e = ImageDecodeError::MalformedDataUri {
            key: "fig.jpg".into(),
        };
        assert_eq!(e.key(), "fig.jpg");
    }

    #[test]
    fn parser_unavailable_display() {
        let e = ParserError::Unavailable {
            reason: "no layout engine linked".into(),
        };
        assert!(e.to_string().contains("not available"));
        assert!(e.to_string().contains("no layout engine"));
    }

    #[test]
    fn parser_failed_display() {
        let e = ParserError::Failed {
            parser: "layout".into(),
            detail: "corrupt xref".into(),
        };
        assert!(e.to_string().contains("layout"));
        assert!(e.to_string().contains("corrupt xref"));
    }
}
