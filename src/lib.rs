//! # unstructured-export
//!
//! Turn the output of a structured document parser into Markdown, HTML or
//! XLSX files.
//!
//! ## Why this crate?
//!
//! A layout-aware PDF parser produces several parallel views of the same
//! document: Markdown lines, HTML lines, tables and charts as data, and the
//! images they all reference. Downstream consumers each want one of those
//! views as a file. This crate holds the parse result in a portable model
//! and renders it through a single dispatcher, so an HTTP service, a batch
//! job and an embedding application all produce identical bytes.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF ──▶ DocumentParser (external) ──▶ ParseResult
//!                                        │  md_lines · html_lines
//!                                        │  structured_items · images
//!                                        ▼
//!                              export(result, "html")
//!                    ┌──────────────┼──────────────┐
//!                    ▼              ▼              ▼
//!                Markdown         HTML           XLSX
//!               (md_lines)   (html_lines +   (structured_items,
//!                               images)       one sheet each)
//! ```
//!
//! A result can also travel as JSON ([`ExportPayload`], images in base64)
//! and be reconstructed later; undecodable images are dropped, the rest of
//! the document survives.
//!
//! ## Quick Start
//!
//! ```rust
//! use unstructured_export::{export, ParseResult, StructuredItem};
//! use serde_json::json;
//!
//! let mut result = ParseResult::default();
//! result.md_lines = vec!["# Q3 Report".into(), "Revenue grew.".into()];
//! result.structured_items.push(
//!     StructuredItem::new()
//!         .with("title", "Revenue")
//!         .with("headers", json!(["Quarter", "EUR"]))
//!         .with("rows", json!([["Q3", 1200]])),
//! );
//!
//! let md = export(&result, "markdown")?;
//! assert_eq!(md, b"# Q3 Report\nRevenue grew.\n");
//!
//! let xlsx = export(&result, "Excel")?;
//! assert!(xlsx.starts_with(b"PK"));
//! # Ok::<(), unstructured_export::ExportError>(())
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `docexport` binary (clap + indicatif + tokio) |
//! | `server` | on      | Enables [`server`] and the `unstructured-api` binary (axum + tower-http) |
//!
//! Disable both when using only the library:
//! ```toml
//! unstructured-export = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod exporters;
pub mod format;
pub mod model;
pub mod parser;
pub mod payload;

#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExportConfig, ExportConfigBuilder, ImageMode};
pub use error::{ExportError, ImageDecodeError, ParserError};
pub use export::{export, export_as, export_with_config};
pub use format::{ExportFormat, Exported};
pub use model::{ImageEntry, ImageStore, ParseResult, StructuredItem};
pub use parser::{parse_bytes, DocumentParser, SharedParser, UnavailableParser};
pub use payload::ExportPayload;
