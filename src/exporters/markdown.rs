//! Markdown exporter: the Markdown lines are already the document.

/// Join the lines with `\n`, trim the result, and end with exactly one `\n`.
///
/// Infallible and deterministic. An empty (or all-blank) document renders
/// as a single newline.
pub fn render<S: AsRef<str>>(lines: &[S]) -> String {
    let joined = lines
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join("\n");
    let mut out = String::with_capacity(joined.len() + 1);
    out.push_str(joined.trim());
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_blank_body() {
        assert_eq!(render(&["# Title", "", "Body text"]), "# Title\n\nBody text\n");
    }

    #[test]
    fn empty_is_single_newline() {
        let empty: [&str; 0] = [];
        assert_eq!(render(&empty), "\n");
        assert_eq!(render(&["", "  ", "\t"]), "\n");
    }

    #[test]
    fn surrounding_whitespace_trimmed_inner_kept() {
        assert_eq!(render(&["", "  # H", "", "", "text  ", "", ""]), "# H\n\n\ntext\n");
    }

    #[test]
    fn lines_with_embedded_newlines_are_passed_through() {
        assert_eq!(render(&["a\nb", "c"]), "a\nb\nc\n");
    }
}
