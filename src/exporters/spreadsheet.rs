//! Spreadsheet exporter: structured items → minimal OOXML workbook.
//!
//! Each [`StructuredItem`] becomes one worksheet, in input order:
//!
//! ```text
//!     |    A     |    B     |    C     |
//! ----+----------+----------+----------+
//!   1 | Title    |          |          |   (bold, only if `title` is set)
//!   2 | Header 1 | Header 2 | Header 3 |   (bold, only if `headers` is a list)
//!   3 | r1c1     | r1c2     | r1c3     |   (one row per element of `rows`)
//! ```
//!
//! Items are open records, so every field is read defensively: a field with
//! the wrong shape is skipped (logged at `warn`), a bad cell becomes an empty
//! cell, and one odd item never stops the others from being written. The
//! only error is a failure of the ZIP container itself.

use crate::error::ExportError;
use crate::model::StructuredItem;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use tracing::{debug, warn};
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

/// Excel refuses sheet names longer than this.
const MAX_SHEET_NAME_CHARS: usize = 31;
/// Excel's per-cell text limit.
const MAX_CELL_CHARS: usize = 32_767;
/// `s` attribute of the bold cell format in `styles.xml`.
const BOLD_STYLE: u8 = 1;

/// Grid size a worksheet may use. Refs past either bound make Excel reject
/// the whole workbook, so anything beyond is dropped with a warning.
#[derive(Debug, Clone, Copy)]
struct SheetLimits {
    rows: usize,
    columns: usize,
}

/// 1,048,576 rows by 16,384 columns (`A1:XFD1048576`).
const EXCEL_LIMITS: SheetLimits = SheetLimits {
    rows: 1_048_576,
    columns: 16_384,
};

/// Write `items` as an XLSX workbook.
pub fn render(items: &[StructuredItem]) -> Result<Vec<u8>, ExportError> {
    let names = sheet_names(items);
    let sheets: Vec<String> = if items.is_empty() {
        vec![worksheet_xml(None)]
    } else {
        items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                debug!(sheet = idx + 1, name = %names[idx], "Writing worksheet");
                worksheet_xml(Some(item))
            })
            .collect()
    };

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    write_part(&mut zip, "[Content_Types].xml", &content_types_xml(sheets.len()))?;
    write_part(&mut zip, "_rels/.rels", ROOT_RELS)?;
    write_part(&mut zip, "xl/workbook.xml", &workbook_xml(&names))?;
    write_part(&mut zip, "xl/_rels/workbook.xml.rels", &workbook_rels_xml(sheets.len()))?;
    write_part(&mut zip, "xl/styles.xml", STYLES)?;
    for (idx, sheet) in sheets.iter().enumerate() {
        write_part(&mut zip, &format!("xl/worksheets/sheet{}.xml", idx + 1), sheet)?;
    }

    let cursor = zip.finish().map_err(|e| ExportError::SpreadsheetWriteFailed {
        detail: format!("finishing archive: {e}"),
    })?;
    Ok(cursor.into_inner())
}

fn write_part(
    zip: &mut ZipWriter<Cursor<Vec<u8>>>,
    path: &str,
    body: &str,
) -> Result<(), ExportError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(path, options)
        .map_err(|e| ExportError::SpreadsheetWriteFailed {
            detail: format!("{path}: {e}"),
        })?;
    zip.write_all(body.as_bytes())
        .map_err(|e| ExportError::SpreadsheetWriteFailed {
            detail: format!("{path}: {e}"),
        })
}

// ── Sheet names ──────────────────────────────────────────────────────────

/// One unique, Excel-legal name per item (or `Sheet1` for an empty workbook).
fn sheet_names(items: &[StructuredItem]) -> Vec<String> {
    if items.is_empty() {
        return vec!["Sheet1".to_string()];
    }

    let mut taken: HashSet<String> = HashSet::new();
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let base = item
                .title()
                .map(sanitize_sheet_name)
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| fallback_sheet_name(item, idx));
            let name = unique_name(&base, &taken);
            taken.insert(name.to_lowercase());
            name
        })
        .collect()
}

fn fallback_sheet_name(item: &StructuredItem, idx: usize) -> String {
    let kind = match item.kind() {
        Some(k) if k.eq_ignore_ascii_case("chart") => "Chart",
        _ => "Table",
    };
    format!("{} {}", kind, idx + 1)
}

fn sanitize_sheet_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\') && !c.is_control())
        .collect();
    let trimmed = cleaned.trim().trim_matches('\'').trim();
    truncate_chars(trimmed, MAX_SHEET_NAME_CHARS).trim_end().to_string()
}

/// Sheet names are unique case-insensitively; collide → "name (2)", "name (3)", …
fn unique_name(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(&base.to_lowercase()) {
        return base.to_string();
    }
    let mut n = 2usize;
    loop {
        let suffix = format!(" ({n})");
        let room = MAX_SHEET_NAME_CHARS - suffix.chars().count();
        let candidate = format!("{}{}", truncate_chars(base, room).trim_end(), suffix);
        if !taken.contains(&candidate.to_lowercase()) {
            return candidate;
        }
        n += 1;
    }
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

// ── Worksheet body ───────────────────────────────────────────────────────

fn worksheet_xml(item: Option<&StructuredItem>) -> String {
    worksheet_xml_within(item, EXCEL_LIMITS)
}

fn worksheet_xml_within(item: Option<&StructuredItem>, limits: SheetLimits) -> String {
    let mut xml = String::with_capacity(4096);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#);
    xml.push_str("<sheetData>");
    if let Some(item) = item {
        write_item_rows(&mut xml, item, limits);
    }
    xml.push_str("</sheetData>");
    xml.push_str("</worksheet>");
    xml
}

fn write_item_rows(xml: &mut String, item: &StructuredItem, limits: SheetLimits) {
    let mut row_num = 1usize;
    let max_cols = limits.columns;

    match item.get("title") {
        Some(Value::String(_)) | None | Some(Value::Null) => {}
        Some(other) => warn!("Structured item title is not a string ({}); ignored", type_name(other)),
    }
    if let Some(title) = item.title() {
        let title = Value::String(title.to_string());
        write_row(xml, row_num, std::iter::once(&title), Some(BOLD_STYLE), max_cols);
        row_num += 1;
    }

    let headers: &[Value] = match (item.get("headers"), item.headers()) {
        (_, Some(h)) => h,
        (Some(Value::Null) | None, None) => &[],
        (Some(other), None) => {
            warn!("Structured item headers is a {}, expected a list; skipped", type_name(other));
            &[]
        }
    };
    if !headers.is_empty() {
        let header_cells: Vec<Value> = headers.iter().map(|h| Value::String(cell_text(h))).collect();
        write_row(xml, row_num, header_cells.iter(), Some(BOLD_STYLE), max_cols);
        row_num += 1;
    }

    let rows: &[Value] = match (item.get("rows"), item.rows()) {
        (_, Some(r)) => r,
        (Some(Value::Null) | None, None) => &[],
        (Some(other), None) => {
            warn!("Structured item rows is a {}, expected a list; skipped", type_name(other));
            &[]
        }
    };
    let room = limits.rows.saturating_sub(row_num - 1);
    if rows.len() > room {
        warn!(
            rows = rows.len(),
            kept = room,
            "Structured item has more rows than a worksheet holds; extra rows dropped"
        );
    }
    for row in rows.iter().take(room) {
        match row {
            Value::Array(cells) => write_row(xml, row_num, cells.iter(), None, max_cols),
            Value::Object(map) if !headers.is_empty() => {
                let cells: Vec<Value> = headers
                    .iter()
                    .map(|h| map.get(&cell_text(h)).cloned().unwrap_or(Value::Null))
                    .collect();
                write_row(xml, row_num, cells.iter(), None, max_cols);
            }
            Value::Object(map) => write_row(xml, row_num, map.values(), None, max_cols),
            scalar => write_row(xml, row_num, std::iter::once(scalar), None, max_cols),
        }
        row_num += 1;
    }
}

fn write_row<'a>(
    xml: &mut String,
    row_num: usize,
    cells: impl Iterator<Item = &'a Value>,
    style: Option<u8>,
    max_cols: usize,
) {
    let _ = write!(xml, r#"<row r="{row_num}">"#);
    let mut cells = cells.enumerate();
    for (col, value) in cells.by_ref().take(max_cols) {
        write_cell(xml, &format!("{}{}", column_letter(col), row_num), value, style);
    }
    let dropped = cells.count();
    if dropped > 0 {
        warn!(row = row_num, dropped, "Row is wider than {max_cols} columns; extra cells dropped");
    }
    xml.push_str("</row>");
}

fn write_cell(xml: &mut String, cell_ref: &str, value: &Value, style: Option<u8>) {
    let style_attr = style.map(|s| format!(r#" s="{s}""#)).unwrap_or_default();
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            let _ = write!(xml, r#"<c r="{cell_ref}"{style_attr} t="b"><v>{}</v></c>"#, u8::from(*b));
        }
        Value::Number(n) => {
            let _ = write!(xml, r#"<c r="{cell_ref}"{style_attr}><v>{n}</v></c>"#);
        }
        Value::String(s) if s.is_empty() => {}
        other => {
            let text = cell_text(other);
            let _ = write!(
                xml,
                r#"<c r="{cell_ref}"{style_attr} t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                escape_xml(truncate_chars(&text, MAX_CELL_CHARS))
            );
        }
    }
}

/// Display text of a value: strings verbatim, everything else as compact JSON.
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// Convert a 0-based column index to Excel column letters (0=A, 25=Z, 26=AA).
fn column_letter(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;

    loop {
        let remainder = n % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }

    result
}

/// Escape XML special characters and drop characters XML 1.0 cannot carry.
fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if (c as u32) < 0x20 || c == '\u{FFFE}' || c == '\u{FFFF}' => {}
            c => out.push(c),
        }
    }
    out
}

// ── Package parts ────────────────────────────────────────────────────────

fn content_types_xml(sheet_count: usize) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
"#,
    );
    for i in 1..=sheet_count {
        let _ = writeln!(
            xml,
            r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        );
    }
    xml.push_str("</Types>");
    xml
}

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

fn workbook_xml(names: &[String]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets>
"#,
    );
    for (idx, name) in names.iter().enumerate() {
        let id = idx + 1;
        let _ = writeln!(
            xml,
            r#"<sheet name="{}" sheetId="{id}" r:id="rId{id}"/>"#,
            escape_xml(name)
        );
    }
    xml.push_str("</sheets>\n</workbook>");
    xml
}

fn workbook_rels_xml(sheet_count: usize) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
"#,
    );
    for i in 1..=sheet_count {
        let _ = writeln!(
            xml,
            r#"<Relationship Id="rId{i}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{i}.xml"/>"#
        );
    }
    let _ = writeln!(
        xml,
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
        sheet_count + 1
    );
    xml.push_str("</Relationships>");
    xml
}

/// Two cell formats: 0 = default, 1 = bold.
const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts>
<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>
<borders count="1"><border/></borders>
<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
<cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/></cellXfs>
</styleSheet>"#;
