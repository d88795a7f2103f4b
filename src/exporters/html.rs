//! HTML exporter: assemble a complete document from HTML lines.
//!
//! Image references are resolved against the shared Image Store and either
//! inlined as `data:` URIs or pointed at a base URL, depending on
//! [`ImageMode`]. A reference the store does not know is left exactly as
//! written; the browser shows a broken image and the export still succeeds.

use crate::config::{ExportConfig, ImageMode};
use crate::model::{is_relative_reference, ImageStore, RE_IMG_SRC};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

const STYLESHEET: &str = "body { font-family: system-ui, sans-serif; line-height: 1.5; max-width: 60rem; margin: 2rem auto; padding: 0 1rem; }
table { border-collapse: collapse; margin: 1rem 0; }
th, td { border: 1px solid #ccc; padding: 0.25rem 0.5rem; text-align: left; vertical-align: top; }
img { max-width: 100%; height: auto; }";

static RE_HTML_ROOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<html[\s>]").unwrap());

/// Render `html_lines` into a full HTML document.
///
/// Lines that already form a document (contain an `<html>` element) only get
/// their image references rewritten; a fragment is wrapped in a minimal
/// HTML5 skeleton first.
pub fn render<S: AsRef<str>>(html_lines: &[S], images: &ImageStore, config: &ExportConfig) -> String {
    let body = html_lines
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join("\n");
    let body = rewrite_image_sources(&body, images, &config.image_mode);

    if RE_HTML_ROOT.is_match(&body) {
        let mut doc = body;
        if !doc.ends_with('\n') {
            doc.push('\n');
        }
        return doc;
    }

    wrap_document(&body, config)
}

/// Replace every resolvable `<img src>` with its embedded or linked form.
fn rewrite_image_sources(html: &str, images: &ImageStore, mode: &ImageMode) -> String {
    let mut resolved = 0usize;
    let mut unresolved = 0usize;

    let out = RE_IMG_SRC.replace_all(html, |caps: &Captures| {
        let prefix = &caps[1];
        let (reference, quote) = match (caps.get(2), caps.get(3)) {
            (Some(m), _) => (m.as_str(), '"'),
            (None, Some(m)) => (m.as_str(), '\''),
            (None, None) => return caps[0].to_string(),
        };

        if !is_relative_reference(reference) {
            return caps[0].to_string();
        }

        match images.resolve(reference) {
            Some(entry) => {
                resolved += 1;
                let src = match mode {
                    ImageMode::Embed => entry.to_data_uri(),
                    ImageMode::Link { base_url } => ImageMode::link_for(base_url, reference),
                };
                format!("{prefix}\"{}\"", escape_attr(&src))
            }
            None => {
                unresolved += 1;
                format!("{prefix}{quote}{reference}{quote}")
            }
        }
    });

    debug!(resolved, unresolved, "Rewrote HTML image references");
    out.into_owned()
}

fn wrap_document(body: &str, config: &ExportConfig) -> String {
    let title = html_escape::encode_text(&config.html_title);
    let mut doc = String::with_capacity(body.len() + 512);

    doc.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    doc.push_str("<meta charset=\"utf-8\">\n");
    doc.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    doc.push_str(&format!("<title>{title}</title>\n"));
    if config.html_styles {
        doc.push_str("<style>\n");
        doc.push_str(STYLESHEET);
        doc.push_str("\n</style>\n");
    }
    doc.push_str("</head>\n<body>\n");
    doc.push_str(body);
    if !body.is_empty() && !body.ends_with('\n') {
        doc.push('\n');
    }
    doc.push_str("</body>\n</html>\n");
    doc
}

/// Attribute values we produce only ever need `"` and `&` neutralised.
fn escape_attr(s: &str) -> String {
    html_escape::encode_double_quoted_attribute(s).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ImageStore {
        let mut images = ImageStore::new();
        images.insert("images/p1.png", b"png".to_vec(), "image/png");
        images
    }

    #[test]
    fn fragment_is_wrapped() {
        let doc = render(&["<h1>T</h1>", "<p>x</p>"], &ImageStore::new(), &ExportConfig::default());
        assert!(doc.starts_with("<!DOCTYPE html>\n"));
        assert!(doc.contains("<meta charset=\"utf-8\">"));
        assert!(doc.contains("<title>Document</title>"));
        assert!(doc.contains("<body>\n<h1>T</h1>\n<p>x</p>\n</body>"));
        assert!(doc.ends_with("</html>\n"));
    }

    #[test]
    fn title_is_escaped_and_styles_optional() {
        let config = ExportConfig::builder()
            .html_title("A <b> & C")
            .html_styles(false)
            .build()
            .unwrap();
        let doc = render(&["<p/>"], &ImageStore::new(), &config);
        assert!(doc.contains("<title>A &lt;b&gt; &amp; C</title>"));
        assert!(!doc.contains("<style>"));
    }

    #[test]
    fn embeds_known_image() {
        let doc = render(
            &[r#"<img alt="p" src="images/p1.png">"#],
            &store(),
            &ExportConfig::default(),
        );
        assert!(doc.contains(r#"<img alt="p" src="data:image/png;base64,cG5n">"#), "{doc}");
    }

    #[test]
    fn single_quoted_and_dot_slash_references_resolve() {
        let doc = render(&["<img src='./images/p1.png'/>"], &store(), &ExportConfig::default());
        assert!(doc.contains(r#"src="data:image/png;base64,cG5n""#), "{doc}");
    }

    #[test]
    fn dangling_reference_left_as_is() {
        let doc = render(
            &[r#"<img src="images/missing.png">"#, "<img src='other.jpg'>"],
            &store(),
            &ExportConfig::default(),
        );
        assert!(doc.contains(r#"<img src="images/missing.png">"#));
        assert!(doc.contains("<img src='other.jpg'>"));
    }

    #[test]
    fn data_src_left_alone_and_real_src_embedded() {
        let mut images = store();
        images.insert("lazy.png", b"lazy".to_vec(), "image/png");
        let doc = render(
            &[r#"<img data-src="lazy.png" src="images/p1.png">"#],
            &images,
            &ExportConfig::default(),
        );
        assert!(
            doc.contains(r#"<img data-src="lazy.png" src="data:image/png;base64,cG5n">"#),
            "{doc}"
        );
    }

    #[test]
    fn link_mode_points_at_base_url() {
        let config = ExportConfig::builder()
            .image_mode(ImageMode::Link {
                base_url: "https://cdn.example/doc".into(),
            })
            .build()
            .unwrap();
        let doc = render(&[r#"<img src="images/p1.png">"#], &store(), &config);
        assert!(doc.contains(r#"<img src="https://cdn.example/doc/images/p1.png">"#), "{doc}");
    }

    #[test]
    fn absolute_urls_untouched() {
        let html = r#"<img src="https://example.com/images/p1.png">"#;
        let doc = render(&[html], &store(), &ExportConfig::default());
        assert!(doc.contains(html));
    }

    #[test]
    fn full_document_not_wrapped_twice() {
        let lines = [
            "<!DOCTYPE html>",
            "<html><head><title>Own</title></head>",
            r#"<body><img src="images/p1.png"></body></html>"#,
        ];
        let doc = render(&lines, &store(), &ExportConfig::default());
        assert_eq!(doc.matches("<html").count(), 1);
        assert!(doc.contains("<title>Own</title>"));
        assert!(doc.contains("data:image/png;base64,cG5n"));
    }

    #[test]
    fn empty_input_still_a_document() {
        let empty: [&str; 0] = [];
        let doc = render(&empty, &ImageStore::new(), &ExportConfig::default());
        assert!(doc.contains("<body>\n</body>"));
    }
}
