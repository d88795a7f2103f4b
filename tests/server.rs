//! HTTP boundary behaviour of the reference transport.
#![cfg(feature = "server")]

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;
use unstructured_export::server::{router, AppState};
use unstructured_export::{DocumentParser, ParseResult, ParserError, StructuredItem};

const BOUNDARY: &str = "X-TEST-BOUNDARY";

/// Returns a fixed result and counts how often it ran.
struct FixedParser {
    calls: AtomicUsize,
}

impl DocumentParser for FixedParser {
    fn name(&self) -> &str {
        "fixed"
    }

    fn parse_file(&self, path: &Path) -> Result<ParseResult, ParserError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(path.exists(), "upload staged on disk while parsing");
        let mut result = ParseResult {
            md_lines: vec!["# Parsed".into(), "body".into()],
            html_lines: vec!["<h1>Parsed</h1>".into()],
            structured_items: vec![StructuredItem::new().with("title", "T")],
            ..ParseResult::default()
        };
        result.images.insert("img/a.png", b"hello".to_vec(), "image/png");
        Ok(result)
    }
}

fn fixed_app() -> (Router, Arc<FixedParser>) {
    let parser = Arc::new(FixedParser {
        calls: AtomicUsize::new(0),
    });
    (router(AppState::new(parser.clone())), parser)
}

fn multipart_body(file_name: Option<&str>, format: Option<&str>) -> Vec<u8> {
    let mut body = String::new();
    if let Some(name) = file_name {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\n\
             Content-Type: application/pdf\r\n\r\n%PDF-1.7 test\r\n"
        ));
    }
    if let Some(format) = format {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"format\"\r\n\r\n{format}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    body.into_bytes()
}

fn multipart_request(uri: &str, file_name: Option<&str>, format: Option<&str>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(file_name, format)))
        .unwrap()
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn header_str<'a>(response: &'a Response, name: header::HeaderName) -> &'a str {
    response.headers().get(name).unwrap().to_str().unwrap()
}

// ── Info routes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn health_lists_supported_formats() {
    let app = router(AppState::default());
    let response = app
        .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "success": true,
            "data": {"status": "ok", "supported_export_formats": ["markdown", "html", "excel"]},
            "error": null
        })
    );
}

#[tokio::test]
async fn root_describes_service() {
    let app = router(AppState::default());
    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["service"], "unstructured-api");
    assert_eq!(json["health"], "/api/v1/health");
}

// ── Export ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn export_markdown_sets_type_and_filename() {
    let app = router(AppState::default());
    let response = app
        .oneshot(json_request(
            "/api/v1/export",
            json!({"md_lines": ["# Title", "", "Body text"], "format": " Markdown "}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, header::CONTENT_TYPE), "text/markdown");
    assert_eq!(
        header_str(&response, header::CONTENT_DISPOSITION),
        "attachment; filename=\"export.md\""
    );
    assert_eq!(body_bytes(response).await, b"# Title\n\nBody text\n");
}

#[tokio::test]
async fn export_excel_returns_workbook() {
    let app = router(AppState::default());
    let response = app
        .oneshot(json_request(
            "/api/v1/export",
            json!({
                "structured_items": [{"title": "A", "rows": [[1, 2]]}, {"title": "B"}],
                "format": "excel"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_str(&response, header::CONTENT_TYPE),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    assert_eq!(
        header_str(&response, header::CONTENT_DISPOSITION),
        "attachment; filename=\"export.xlsx\""
    );
    assert!(body_bytes(response).await.starts_with(b"PK"));
}

#[tokio::test]
async fn export_html_embeds_images_and_survives_bad_ones() {
    let app = router(AppState::default());
    let response = app
        .oneshot(json_request(
            "/api/v1/export",
            json!({
                "html_lines": ["<img src=\"a.png\">", "<img src=\"b.png\">"],
                "images": {"a.png": "aGVsbG8=", "b.png": "***"},
                "format": "html"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("src=\"data:image/jpeg;base64,aGVsbG8=\""));
    assert!(html.contains("<img src=\"b.png\">"));
}

#[tokio::test]
async fn export_rejects_unknown_format() {
    let app = router(AppState::default());
    let response = app
        .oneshot(json_request("/api/v1/export", json!({"format": "json"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("markdown, html, excel"));
}

// ── Documents ────────────────────────────────────────────────────────────

#[tokio::test]
async fn parse_without_parser_is_503() {
    let app = router(AppState::default());
    let response = app
        .oneshot(multipart_request("/api/v1/documents/parse", Some("report.pdf"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().starts_with("Parser not available"));
}

#[tokio::test]
async fn non_pdf_upload_is_400() {
    let (app, parser) = fixed_app();
    let response = app
        .oneshot(multipart_request("/api/v1/documents/parse", Some("notes.docx"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(parser.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_file_is_400() {
    let (app, _) = fixed_app();
    let response = app
        .oneshot(multipart_request("/api/v1/documents/parse", None, Some("html")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn parse_returns_payload_with_base64_images() {
    let (app, parser) = fixed_app();
    let response = app
        .oneshot(multipart_request("/api/v1/documents/parse", Some("Report.PDF"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parser.calls.load(Ordering::SeqCst), 1);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["md_lines"], json!(["# Parsed", "body"]));
    assert_eq!(json["data"]["images"]["img/a.png"], "aGVsbG8=");
    assert_eq!(json["data"]["structured_items"][0]["title"], "T");
}

#[tokio::test]
async fn parse_and_export_defaults_to_html_named_after_upload() {
    let (app, _) = fixed_app();
    let response = app
        .oneshot(multipart_request(
            "/api/v1/documents/parse-and-export",
            Some("q3.report.pdf"),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, header::CONTENT_TYPE), "text/html");
    assert_eq!(
        header_str(&response, header::CONTENT_DISPOSITION),
        "attachment; filename=\"q3.report.html\""
    );
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("<h1>Parsed</h1>"));
}

#[tokio::test]
async fn parse_and_export_markdown() {
    let (app, _) = fixed_app();
    let response = app
        .oneshot(multipart_request(
            "/api/v1/documents/parse-and-export",
            Some("scan.pdf"),
            Some("MARKDOWN"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_str(&response, header::CONTENT_DISPOSITION),
        "attachment; filename=\"scan.md\""
    );
    assert_eq!(body_bytes(response).await, b"# Parsed\nbody\n");
}

#[tokio::test]
async fn parse_and_export_validates_format_before_parsing() {
    let (app, parser) = fixed_app();
    let response = app
        .oneshot(multipart_request(
            "/api/v1/documents/parse-and-export",
            Some("scan.pdf"),
            Some("docx"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(parser.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn parser_failure_is_400() {
    struct Broken;
    impl DocumentParser for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        fn parse_file(&self, _path: &Path) -> Result<ParseResult, ParserError> {
            Err(ParserError::Failed {
                parser: "broken".into(),
                detail: "corrupt xref table".into(),
            })
        }
    }

    let app = router(AppState::new(Arc::new(Broken)));
    let response = app
        .oneshot(multipart_request("/api/v1/documents/parse", Some("x.pdf"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("corrupt xref table"));
}
