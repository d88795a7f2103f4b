//! Wire payload: a previously parsed result sent back for export.
//!
//! A client that already holds a parse (for example the JSON returned by the
//! parse endpoint) can send it back instead of re-uploading the document.
//! Images travel as text, so rebuilding the [`ParseResult`] means decoding
//! every image value. One undecodable image must not cost the caller the
//! whole document: it is dropped, logged and reported as an
//! [`ImageDecodeError`], and reconstruction carries on.
//!
//! Accepted image encodings:
//! - plain standard base64 (ASCII whitespace ignored), labelled with the
//!   configured default MIME type since the wire carries no type
//! - `data:<mime>;base64,<payload>`, keeping the declared MIME type

use crate::config::DEFAULT_IMAGE_MIME;
use crate::error::ImageDecodeError;
use crate::model::{ImageEntry, ImageStore, ParseResult, StructuredItem};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Serialised form of a [`ParseResult`].
///
/// Every field may be omitted or `null`; it then defaults to empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportPayload {
    /// Markdown content lines.
    #[serde(default, deserialize_with = "null_as_default")]
    pub md_lines: Vec<String>,
    /// HTML content lines.
    #[serde(default, deserialize_with = "null_as_default")]
    pub html_lines: Vec<String>,
    /// Tables/charts data.
    #[serde(default, deserialize_with = "null_as_default")]
    pub structured_items: Vec<StructuredItem>,
    /// Relative path → base64 image data.
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: BTreeMap<String, String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ExportPayload {
    /// Encode a result for the wire. Images become plain standard base64.
    pub fn from_result(result: &ParseResult) -> Self {
        Self {
            md_lines: result.md_lines.clone(),
            html_lines: result.html_lines.clone(),
            structured_items: result.structured_items.clone(),
            images: result
                .images
                .iter()
                .map(|(key, entry)| (key.to_string(), STANDARD.encode(&entry.data)))
                .collect(),
        }
    }

    /// Rebuild the [`ParseResult`], silently dropping undecodable images.
    ///
    /// `default_mime` labels images that arrive as plain base64.
    pub fn into_result(self, default_mime: &str) -> ParseResult {
        self.into_result_with_report(default_mime).0
    }

    /// Rebuild the [`ParseResult`] and also return one error per dropped image.
    pub fn into_result_with_report(self, default_mime: &str) -> (ParseResult, Vec<ImageDecodeError>) {
        let mut images = ImageStore::new();
        let mut dropped = Vec::new();

        for (key, value) in self.images {
            match decode_image(&key, &value, default_mime) {
                Ok(entry) => {
                    images.insert(key, entry.data, entry.mime_type);
                }
                Err(e) => {
                    warn!("Dropping image during reconstruction: {}", e);
                    dropped.push(e);
                }
            }
        }

        debug!(
            kept = images.len(),
            dropped = dropped.len(),
            "Reconstructed parse result from payload"
        );

        let result = ParseResult::new(self.md_lines, self.html_lines, self.structured_items, images);
        (result, dropped)
    }
}

impl From<ExportPayload> for ParseResult {
    fn from(payload: ExportPayload) -> Self {
        payload.into_result(DEFAULT_IMAGE_MIME)
    }
}

impl From<&ParseResult> for ExportPayload {
    fn from(result: &ParseResult) -> Self {
        ExportPayload::from_result(result)
    }
}

/// Decode one wire image value.
pub fn decode_image(key: &str, value: &str, default_mime: &str) -> Result<ImageEntry, ImageDecodeError> {
    let value = value.trim();

    let (mime, encoded) = match split_data_uri(value) {
        Some(Ok((mime, encoded))) => (mime.unwrap_or(default_mime), encoded),
        Some(Err(())) => {
            return Err(ImageDecodeError::MalformedDataUri {
                key: key.to_string(),
            })
        }
        None => (default_mime, value),
    };

    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let data = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| ImageDecodeError::InvalidBase64 {
            key: key.to_string(),
            detail: e.to_string(),
        })?;

    Ok(ImageEntry::new(data, mime.to_ascii_lowercase()))
}

/// `None` if `value` is not a data URI; `Some(Err)` if it is one we cannot
/// use; otherwise the declared MIME type (if any) and the base64 payload.
fn split_data_uri(value: &str) -> Option<Result<(Option<&str>, &str), ()>> {
    let scheme = value.get(..5)?;
    if !scheme.eq_ignore_ascii_case("data:") {
        return None;
    }
    let rest = &value[5..];
    let Some((header, payload)) = rest.split_once(',') else {
        return Some(Err(()));
    };

    let mut params = header.split(';');
    let mime = params.next().map(str::trim).filter(|m| !m.is_empty());
    let is_base64 = params.any(|p| p.trim().eq_ignore_ascii_case("base64"));
    if !is_base64 {
        return Some(Err(()));
    }
    Some(Ok((mime, payload)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn well_formed_kept_malformed_dropped() {
        let payload: ExportPayload = serde_json::from_value(json!({
            "md_lines": ["![a](a.png)"],
            "images": {
                "a.png": "aGVsbG8=",
                "b.png": "not base64!!"
            }
        }))
        .unwrap();

        let (result, dropped) = payload.into_result_with_report("image/jpeg");
        assert_eq!(result.images.len(), 1);
        let a = result.images.get("a.png").unwrap();
        assert_eq!(a.data, b"hello");
        assert_eq!(a.mime_type, "image/jpeg");
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].key(), "b.png");
        assert_eq!(result.md_lines, vec!["![a](a.png)"]);
    }

    #[test]
    fn data_uri_keeps_declared_mime() {
        let entry = decode_image("x", "data:image/PNG;base64,aGk=", "image/jpeg").unwrap();
        assert_eq!(entry.mime_type, "image/png");
        assert_eq!(entry.data, b"hi");

        let entry = decode_image("x", "data:;base64,aGk=", "image/jpeg").unwrap();
        assert_eq!(entry.mime_type, "image/jpeg");
    }

    #[test]
    fn data_uri_without_base64_is_malformed() {
        let err = decode_image("x", "data:image/svg+xml,<svg/>", "image/jpeg").unwrap_err();
        assert_eq!(err, ImageDecodeError::MalformedDataUri { key: "x".into() });
        assert!(decode_image("x", "data:image/png", "image/jpeg").is_err());
    }

    #[test]
    fn wrapped_base64_is_accepted() {
        let entry = decode_image("x", "aGVs\nbG8=\n", "image/jpeg").unwrap();
        assert_eq!(entry.data, b"hello");
    }

    #[test]
    fn missing_and_null_fields_default_to_empty() {
        let payload: ExportPayload = serde_json::from_value(json!({
            "md_lines": null,
            "html_lines": ["<p>x</p>"]
        }))
        .unwrap();
        assert!(payload.md_lines.is_empty());
        assert_eq!(payload.html_lines.len(), 1);
        assert!(payload.structured_items.is_empty());
        assert!(payload.images.is_empty());
    }

    #[test]
    fn from_result_encodes_plain_base64() {
        let mut images = ImageStore::new();
        images.insert("p.png", b"hello".to_vec(), "image/png");
        let result = ParseResult::new(vec!["x".into()], vec![], vec![], images);

        let payload = ExportPayload::from_result(&result);
        assert_eq!(payload.images.get("p.png").map(String::as_str), Some("aGVsbG8="));

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["md_lines"], json!(["x"]));
        assert_eq!(json["images"]["p.png"], json!("aGVsbG8="));
    }

    #[test]
    fn from_payload_uses_fixed_default_mime() {
        let payload = ExportPayload {
            images: BTreeMap::from([("p.gif".to_string(), "R0lG".to_string())]),
            ..ExportPayload::default()
        };
        let result = ParseResult::from(payload);
        assert_eq!(result.images.get("p.gif").unwrap().mime_type, DEFAULT_IMAGE_MIME);
    }
}
