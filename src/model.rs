//! The Result Model: the format-agnostic representation of a parsed document.
//!
//! A [`ParseResult`] carries three parallel representations of the same
//! content (Markdown lines, HTML lines, structured table/chart records) plus
//! the [`ImageStore`] both textual representations point into. It is built
//! once, by the external parser or by [`crate::payload::ExportPayload`]
//! reconstruction, and every exporter only ever borrows it.
//!
//! Image references inside the text are relative paths used as opaque keys.
//! A reference without a matching entry is allowed: exporters render it as a
//! broken link and [`ParseResult::dangling_references`] reports it.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// In-memory result of parsing a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    /// Markdown document as ordered lines; images referenced by relative path.
    pub md_lines: Vec<String>,
    /// HTML fragment as ordered lines; `<img src>` uses the same relative paths.
    pub html_lines: Vec<String>,
    /// Table/chart records, consumed only by the spreadsheet exporter.
    pub structured_items: Vec<StructuredItem>,
    /// Relative-path key → image bytes and MIME type.
    pub images: ImageStore,
}

impl ParseResult {
    pub fn new(
        md_lines: Vec<String>,
        html_lines: Vec<String>,
        structured_items: Vec<StructuredItem>,
        images: ImageStore,
    ) -> Self {
        Self {
            md_lines,
            html_lines,
            structured_items,
            images,
        }
    }

    /// A result with no content at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every relative-path image reference in `md_lines` and `html_lines`,
    /// in document order (Markdown first), without duplicates.
    ///
    /// Absolute URLs, protocol-relative URLs, fragments and `data:` URIs are
    /// not references into the Image Store and are skipped.
    pub fn image_references(&self) -> Vec<String> {
        unique_references(self.markdown_refs().chain(self.html_refs()))
    }

    /// Relative-path references in `md_lines` only.
    pub fn markdown_image_references(&self) -> Vec<String> {
        unique_references(self.markdown_refs())
    }

    /// Relative-path `<img src>` references in `html_lines` only.
    pub fn html_image_references(&self) -> Vec<String> {
        unique_references(self.html_refs())
    }

    /// References that have no entry in [`ParseResult::images`].
    pub fn dangling_references(&self) -> Vec<String> {
        self.unresolved(self.image_references())
    }

    /// Keep the references that have no entry in the Image Store.
    pub(crate) fn unresolved(&self, refs: Vec<String>) -> Vec<String> {
        refs.into_iter()
            .filter(|r| self.images.resolve(r).is_none())
            .collect()
    }

    fn markdown_refs(&self) -> impl Iterator<Item = &str> {
        self.md_lines
            .iter()
            .flat_map(|line| RE_MD_IMAGE.captures_iter(line))
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
    }

    fn html_refs(&self) -> impl Iterator<Item = &str> {
        self.html_lines
            .iter()
            .flat_map(|line| RE_IMG_SRC.captures_iter(line))
            .filter_map(|caps| caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str()))
    }
}

fn unique_references<'a>(refs: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    refs.filter(|r| is_relative_reference(r) && seen.insert(*r))
        .map(str::to_string)
        .collect()
}

// ── Reference scanning ───────────────────────────────────────────────────

/// `![alt](ref)` and `![alt](ref "title")`.
static RE_MD_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"!\[[^\]]*\]\(\s*<?([^)\s>]+)>?(?:\s+"[^"]*")?\s*\)"#).unwrap()
});

/// `<img ... src="ref">` / `src='ref'`. Group 1 is everything up to the
/// opening quote, group 2 / 3 the double / single quoted value. The
/// attribute name must follow whitespace or `/`, so `data-src` and other
/// `*-src` attributes are not mistaken for `src`.
pub(crate) static RE_IMG_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(<img\b[^>]*?[\s/]src\s*=\s*)(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

/// Whether `reference` points into the Image Store rather than elsewhere.
pub(crate) fn is_relative_reference(reference: &str) -> bool {
    let r = reference.trim();
    !(r.is_empty()
        || r.starts_with('#')
        || r.starts_with("//")
        || r.contains("://")
        || r.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("data:")))
}

// ── Image Store ──────────────────────────────────────────────────────────

/// Raw image bytes plus the MIME type they are served with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageEntry {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl ImageEntry {
    pub fn new(data: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    /// `data:<mime>;base64,<payload>` for inlining in HTML.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }
}

/// Mapping from relative-path reference to image data.
///
/// Keys are opaque strings. Iteration is in key order so that everything
/// derived from the store is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageStore {
    entries: BTreeMap<String, ImageEntry>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an image, returning the entry it replaced, if any.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        data: impl Into<Vec<u8>>,
        mime_type: impl Into<String>,
    ) -> Option<ImageEntry> {
        self.entries
            .insert(key.into(), ImageEntry::new(data, mime_type))
    }

    pub fn get(&self, key: &str) -> Option<&ImageEntry> {
        self.entries.get(key)
    }

    /// Look up a reference as written in the text: the exact key first, then
    /// the key without a leading `./`.
    pub fn resolve(&self, reference: &str) -> Option<&ImageEntry> {
        self.entries.get(reference).or_else(|| {
            reference
                .strip_prefix("./")
                .and_then(|stripped| self.entries.get(stripped))
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ImageEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, ImageEntry)> for ImageStore {
    fn from_iter<I: IntoIterator<Item = (String, ImageEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

// ── Structured items ─────────────────────────────────────────────────────

/// One table or chart record.
///
/// An open JSON object: by convention it carries `title`, `headers` and
/// `rows` (and sometimes `type`), but nothing is enforced here. The
/// spreadsheet exporter reads the well-known fields defensively.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredItem(Map<String, Value>);

impl StructuredItem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value; `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Builder-style field setter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Non-empty string `title`.
    pub fn title(&self) -> Option<&str> {
        self.get("title")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// `headers`, when it is an array.
    pub fn headers(&self) -> Option<&[Value]> {
        self.get("headers").and_then(Value::as_array).map(Vec::as_slice)
    }

    /// `rows`, when it is an array.
    pub fn rows(&self) -> Option<&[Value]> {
        self.get("rows").and_then(Value::as_array).map(Vec::as_slice)
    }

    /// `type` ("table", "chart", …), when present as a string.
    pub fn kind(&self) -> Option<&str> {
        self.get("type").and_then(Value::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for StructuredItem {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn insert_overwrites_duplicate_key() {
        let mut store = ImageStore::new();
        assert!(store.insert("a.png", vec![1], "image/png").is_none());
        let old = store.insert("a.png", vec![2, 3], "image/jpeg");
        assert_eq!(old, Some(ImageEntry::new(vec![1], "image/png")));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a.png").unwrap().data, vec![2, 3]);
    }

    #[test]
    fn resolve_strips_dot_slash() {
        let mut store = ImageStore::new();
        store.insert("images/p1.png", vec![0], "image/png");
        assert!(store.resolve("images/p1.png").is_some());
        assert!(store.resolve("./images/p1.png").is_some());
        assert!(store.resolve("images/p2.png").is_none());
    }

    #[test]
    fn data_uri_encoding() {
        let entry = ImageEntry::new(b"hi".to_vec(), "image/png");
        assert_eq!(entry.to_data_uri(), "data:image/png;base64,aGk=");
    }

    #[test]
    fn image_references_in_order_without_duplicates() {
        let result = ParseResult::new(
            lines(&["![fig](images/a.png) and ![x](images/b.png \"B\")", "![again](images/a.png)"]),
            lines(&[
                r#"<p><img alt="c" src="images/c.png"></p>"#,
                "<IMG SRC='images/b.png'>",
                r#"<img src="https://example.com/remote.png">"#,
                r#"<img src="data:image/png;base64,AAAA">"#,
            ]),
            vec![],
            ImageStore::new(),
        );
        assert_eq!(
            result.image_references(),
            vec!["images/a.png", "images/b.png", "images/c.png"]
        );
    }

    #[test]
    fn lazy_load_attributes_are_not_src() {
        let result = ParseResult::new(
            vec![],
            lines(&[
                r#"<img data-src="lazy.png" src="images/real.png">"#,
                r#"<img data-src='only-lazy.png'>"#,
            ]),
            vec![],
            ImageStore::new(),
        );
        assert_eq!(result.image_references(), vec!["images/real.png"]);
    }

    #[test]
    fn dangling_references_reported() {
        let mut images = ImageStore::new();
        images.insert("images/a.png", vec![1], "image/png");
        let result = ParseResult::new(
            lines(&["![a](images/a.png)", "![gone](images/missing.png)"]),
            vec![],
            vec![],
            images,
        );
        assert_eq!(result.dangling_references(), vec!["images/missing.png"]);
    }

    #[test]
    fn relative_reference_classification() {
        assert!(is_relative_reference("images/p1.png"));
        assert!(is_relative_reference("./p1.png"));
        assert!(!is_relative_reference("http://x/y.png"));
        assert!(!is_relative_reference("//cdn/y.png"));
        assert!(!is_relative_reference("DATA:image/png;base64,AA"));
        assert!(!is_relative_reference("#anchor"));
        assert!(!is_relative_reference(""));
    }

    #[test]
    fn structured_item_accessors_are_defensive() {
        let item = StructuredItem::from_value(json!({
            "title": "  Revenue  ",
            "headers": ["Q", "Amount"],
            "rows": [["Q1", 10]],
            "type": "table"
        }))
        .unwrap();
        assert_eq!(item.title(), Some("Revenue"));
        assert_eq!(item.headers().map(<[Value]>::len), Some(2));
        assert_eq!(item.rows().map(<[Value]>::len), Some(1));
        assert_eq!(item.kind(), Some("table"));

        let odd = StructuredItem::new()
            .with("title", 42)
            .with("headers", "not a list")
            .with("rows", json!({"a": 1}));
        assert_eq!(odd.title(), None);
        assert!(odd.headers().is_none());
        assert!(odd.rows().is_none());

        assert!(StructuredItem::from_value(json!([1, 2])).is_none());
    }

    #[test]
    fn structured_item_serialises_as_plain_object() {
        let item = StructuredItem::new().with("title", "T");
        assert_eq!(serde_json::to_value(&item).unwrap(), json!({"title": "T"}));
    }
}
