//! The three exporters behind the dispatcher.
//!
//! Each submodule turns one part of a [`crate::model::ParseResult`] into one
//! byte representation and nothing else. They never see the requested format
//! string and never touch the filesystem, which keeps each independently
//! testable and lets [`crate::export`] stay a plain `match`.
//!
//! ## Data Flow
//!
//! ```text
//! md_lines ───────────────▶ markdown    ──▶ UTF-8 text
//! html_lines + images ────▶ html        ──▶ UTF-8 text (images inlined or linked)
//! structured_items ───────▶ spreadsheet ──▶ XLSX (ZIP) bytes
//! ```
//!
//! 1. [`markdown`] joins, trims and terminates with one newline.
//! 2. [`html`] resolves `<img>` references against the Image Store and
//!    wraps fragments in an HTML5 skeleton.
//! 3. [`spreadsheet`] writes one worksheet per structured item; malformed
//!    fields degrade to empty cells.

pub mod html;
pub mod markdown;
pub mod spreadsheet;
