//! Configuration types for exporting a [`crate::model::ParseResult`].
//!
//! Every exporter knob lives in [`ExportConfig`], built via its
//! [`ExportConfigBuilder`]. The config is plain data (`Clone + Send + Sync`)
//! so a transport layer can build it once at start-up and share it across
//! concurrent requests.
//!
//! None of these settings change *which* exporter a format maps to; they only
//! tune how the HTML exporter renders and how reconstruction
//! labels images of unknown type.

use crate::error::ExportError;
use serde::{Deserialize, Serialize};

/// MIME type assigned to reconstructed images whose type was not declared.
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Title used for wrapped HTML documents when none is configured.
pub const DEFAULT_HTML_TITLE: &str = "Document";

/// Configuration for an export.
///
/// Built via [`ExportConfig::builder()`] or using [`ExportConfig::default()`].
///
/// # Example
/// ```rust
/// use unstructured_export::{ExportConfig, ImageMode};
///
/// let config = ExportConfig::builder()
///     .html_title("Quarterly report")
///     .image_mode(ImageMode::Link { base_url: "/assets".into() })
///     .build()
///     .unwrap();
/// assert_eq!(config.html_title, "Quarterly report");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// `<title>` of wrapped HTML documents. Default: "Document".
    pub html_title: String,

    /// Emit a small stylesheet (table borders, responsive images) in wrapped
    /// HTML documents. Default: true.
    pub html_styles: bool,

    /// How resolvable `<img>` references are written in HTML output.
    /// Default: [`ImageMode::Embed`].
    pub image_mode: ImageMode,

    /// MIME type given to reconstructed images that arrive as plain base64.
    /// Default: `image/jpeg`.
    ///
    /// The wire payload carries no type information for plain base64 values,
    /// so this is a fixed label rather than a sniffed one.
    pub default_image_mime: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            html_title: DEFAULT_HTML_TITLE.to_string(),
            html_styles: true,
            image_mode: ImageMode::default(),
            default_image_mime: DEFAULT_IMAGE_MIME.to_string(),
        }
    }
}

impl ExportConfig {
    /// Create a new builder for `ExportConfig`.
    pub fn builder() -> ExportConfigBuilder {
        ExportConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExportConfig`].
#[derive(Debug)]
pub struct ExportConfigBuilder {
    config: ExportConfig,
}

impl ExportConfigBuilder {
    pub fn html_title(mut self, title: impl Into<String>) -> Self {
        self.config.html_title = title.into();
        self
    }

    pub fn html_styles(mut self, v: bool) -> Self {
        self.config.html_styles = v;
        self
    }

    pub fn image_mode(mut self, mode: ImageMode) -> Self {
        self.config.image_mode = mode;
        self
    }

    pub fn default_image_mime(mut self, mime: impl Into<String>) -> Self {
        self.config.default_image_mime = mime.into().trim().to_ascii_lowercase();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExportConfig, ExportError> {
        let c = &self.config;
        if !is_mime_type(&c.default_image_mime) {
            return Err(ExportError::InvalidConfig(format!(
                "default image MIME type must look like 'type/subtype', got '{}'",
                c.default_image_mime
            )));
        }
        if let ImageMode::Link { base_url } = &c.image_mode {
            if base_url.trim().is_empty() {
                return Err(ExportError::InvalidConfig(
                    "image base URL must not be empty in link mode".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

fn is_mime_type(s: &str) -> bool {
    match s.split_once('/') {
        Some((ty, sub)) => {
            !ty.is_empty() && !sub.is_empty() && !s.contains(char::is_whitespace)
        }
        None => false,
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the HTML exporter writes `<img>` references that exist in the
/// Image Store. References without an entry are always left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageMode {
    /// Inline the bytes as a `data:` URI, producing a self-contained document. (default)
    #[default]
    Embed,
    /// Point at `<base_url>/<reference>`, for callers that serve the images themselves.
    Link { base_url: String },
}

impl ImageMode {
    /// Render the servable URL for `reference` in link mode. Each path
    /// segment of the reference is percent-encoded; the base URL is used as
    /// given.
    pub fn link_for(base_url: &str, reference: &str) -> String {
        let base = base_url.trim_end_matches('/');
        let path = reference
            .trim_start_matches("./")
            .trim_start_matches('/')
            .split('/')
            .map(urlencoding::encode)
            .collect::<Vec<_>>()
            .join("/");
        format!("{base}/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ExportConfig::default();
        assert_eq!(c.html_title, "Document");
        assert!(c.html_styles);
        assert_eq!(c.image_mode, ImageMode::Embed);
        assert_eq!(c.default_image_mime, "image/jpeg");
    }

    #[test]
    fn builder_normalises_mime() {
        let c = ExportConfig::builder()
            .default_image_mime("  Image/PNG ")
            .build()
            .expect("valid config");
        assert_eq!(c.default_image_mime, "image/png");
    }

    #[test]
    fn builder_rejects_bad_mime() {
        let err = ExportConfig::builder()
            .default_image_mime("jpeg")
            .build()
            .unwrap_err();
        assert!(matches!(err, ExportError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_empty_base_url() {
        let err = ExportConfig::builder()
            .image_mode(ImageMode::Link {
                base_url: "  ".into(),
            })
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("base URL"));
    }

    #[test]
    fn link_for_joins_cleanly() {
        assert_eq!(
            ImageMode::link_for("https://cdn.example/doc/", "./images/p1.png"),
            "https://cdn.example/doc/images/p1.png"
        );
        assert_eq!(ImageMode::link_for("/static", "fig.jpg"), "/static/fig.jpg");
    }

    #[test]
    fn link_for_encodes_each_segment() {
        assert_eq!(
            ImageMode::link_for("https://cdn.example", "my fig#1.png"),
            "https://cdn.example/my%20fig%231.png"
        );
        assert_eq!(
            ImageMode::link_for("/static/", "./p 1/a?b.png"),
            "/static/p%201/a%3Fb.png"
        );
    }
}
