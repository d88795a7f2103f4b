//! Export format identifiers and the bytes an export produces.

use crate::error::ExportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the three downstream representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// UTF-8 Markdown document.
    Markdown,
    /// UTF-8 HTML document.
    Html,
    /// OOXML workbook (`.xlsx`).
    Excel,
}

impl ExportFormat {
    /// Every accepted format, in the order they are listed to users.
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Markdown, ExportFormat::Html, ExportFormat::Excel];

    /// Canonical lowercase identifier.
    pub fn name(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "markdown",
            ExportFormat::Html => "html",
            ExportFormat::Excel => "excel",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "text/markdown",
            ExportFormat::Html => "text/html",
            ExportFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Html => "html",
            ExportFormat::Excel => "xlsx",
        }
    }

    /// Whether the bytes are UTF-8 text.
    pub fn is_text(self) -> bool {
        !matches!(self, ExportFormat::Excel)
    }

    /// "markdown, html, excel"
    pub fn accepted_list() -> String {
        Self::ALL.map(Self::name).join(", ")
    }

    /// Canonical names as owned strings, e.g. for a health payload.
    pub fn names() -> Vec<String> {
        Self::ALL.iter().map(|f| f.name().to_string()).collect()
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    /// Case-insensitive, surrounding whitespace ignored. There is no fallback.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "markdown" => Ok(ExportFormat::Markdown),
            "html" => Ok(ExportFormat::Html),
            "excel" => Ok(ExportFormat::Excel),
            _ => Err(ExportError::UnsupportedFormat {
                format: s.to_string(),
                accepted: Self::accepted_list(),
            }),
        }
    }
}

/// Bytes of a finished export plus the format that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exported {
    pub data: Vec<u8>,
    pub format: ExportFormat,
}

impl Exported {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }

    /// `<stem>.<extension>`, e.g. `report.xlsx`.
    pub fn file_name(&self, stem: &str) -> String {
        format!("{}.{}", stem, self.extension())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}
