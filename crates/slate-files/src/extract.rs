//! Ingest-time plain-text extraction.
//!
//! Recognized text-bearing formats are extracted synchronously when a file
//! is uploaded. Plain-text formats pass through; PDFs go through a naive
//! literal-string scan of uncompressed content streams. Unrecognized
//! formats yield no extracted text and are simply not searchable.

/// File extensions treated as plain UTF-8 text.
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "csv", "json"];

fn extension(filename: &str) -> Option<String> {
    filename.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
}

/// Maps a filename to a content type for storage and retrieval.
pub fn content_type_for(filename: &str) -> &'static str {
    match extension(filename).as_deref() {
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Derives a plain-text extraction for a recognized format.
///
/// Returns `None` for unrecognized formats and for files whose extraction
/// comes out empty; ingest succeeds either way, the file is just not
/// indexed for search.
pub fn extract_text(filename: &str, data: &[u8]) -> Option<String> {
    let ext = extension(filename)?;

    let text = if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        String::from_utf8_lossy(data).into_owned()
    } else if ext == "pdf" {
        extract_pdf_text(data)?
    } else {
        return None;
    };

    let trimmed = text.trim().to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Pulls literal strings out of a PDF's text objects.
///
/// Walks the raw bytes looking for `BT` ... `ET` text objects and decodes
/// every parenthesized string literal inside them, which covers text drawn
/// with `Tj`/`TJ` in uncompressed content streams. Compressed streams are
/// skipped (their bytes contain no recognizable text objects).
fn extract_pdf_text(data: &[u8]) -> Option<String> {
    if !data.starts_with(b"%PDF") {
        return None;
    }

    let mut pieces: Vec<String> = Vec::new();
    let mut in_text_object = false;
    let mut i = 0;

    while i < data.len() {
        if !in_text_object {
            if token_at(data, i, b"BT") {
                in_text_object = true;
                i += 2;
            } else {
                i += 1;
            }
            continue;
        }

        if token_at(data, i, b"ET") {
            in_text_object = false;
            i += 2;
        } else if data[i] == b'(' {
            let (literal, next) = read_string_literal(data, i);
            if !literal.trim().is_empty() {
                pieces.push(literal);
            }
            i = next;
        } else {
            i += 1;
        }
    }

    if pieces.is_empty() {
        None
    } else {
        Some(pieces.join(" "))
    }
}

/// True when a two-byte operator sits at `pos` delimited by whitespace or
/// stream boundaries, so `BT` inside a longer token is not matched.
fn token_at(data: &[u8], pos: usize, token: &[u8]) -> bool {
    if !data[pos..].starts_with(token) {
        return false;
    }
    let before_ok = pos == 0 || data[pos - 1].is_ascii_whitespace();
    let after = pos + token.len();
    let after_ok = after >= data.len() || data[after].is_ascii_whitespace();
    before_ok && after_ok
}

/// Decodes a parenthesized PDF string literal starting at `start` (which
/// must point at `(`). Handles nesting and backslash escapes. Returns the
/// decoded text and the index just past the closing parenthesis.
fn read_string_literal(data: &[u8], start: usize) -> (String, usize) {
    let mut out = Vec::new();
    let mut depth = 1usize;
    let mut i = start + 1;

    while i < data.len() && depth > 0 {
        match data[i] {
            b'\\' if i + 1 < data.len() => {
                let decoded = match data[i + 1] {
                    b'n' => b'\n',
                    b'r' => b'\r',
                    b't' => b'\t',
                    other => other, // covers \( \) \\ and octal's first digit
                };
                out.push(decoded);
                i += 2;
            }
            b'(' => {
                depth += 1;
                out.push(b'(');
                i += 1;
            }
            b')' => {
                depth -= 1;
                if depth > 0 {
                    out.push(b')');
                }
                i += 1;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }

    (String::from_utf8_lossy(&out).into_owned(), i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        let text = extract_text("notes.txt", b"  pythagorean theorem: a^2 + b^2 = c^2\n");
        assert_eq!(
            text.as_deref(),
            Some("pythagorean theorem: a^2 + b^2 = c^2")
        );
    }

    #[test]
    fn markdown_and_csv_are_recognized() {
        assert!(extract_text("readme.MD", b"# title").is_some());
        assert!(extract_text("data.csv", b"a,b\n1,2").is_some());
    }

    #[test]
    fn unknown_format_yields_none() {
        assert!(extract_text("photo.png", &[137, 80, 78, 71]).is_none());
        assert!(extract_text("no_extension", b"text").is_none());
    }

    #[test]
    fn empty_text_yields_none() {
        assert!(extract_text("blank.txt", b"   \n").is_none());
    }

    #[test]
    fn pdf_text_object_literals_are_extracted() {
        let pdf = b"%PDF-1.4\n1 0 obj\nstream\nBT /F1 12 Tf (Hello) Tj (board) Tj ET\nendstream\nendobj\n";
        let text = extract_pdf_text(pdf).unwrap();
        assert_eq!(text, "Hello board");
    }

    #[test]
    fn pdf_escaped_parens_decode() {
        let pdf = b"%PDF-1.4\nBT (f\\(x\\) = x^2) Tj ET\n";
        assert_eq!(extract_pdf_text(pdf).unwrap(), "f(x) = x^2");
    }

    #[test]
    fn pdf_strings_outside_text_objects_are_ignored() {
        let pdf = b"%PDF-1.4\n(metadata title)\nBT (body text) Tj ET\n";
        assert_eq!(extract_pdf_text(pdf).unwrap(), "body text");
    }

    #[test]
    fn non_pdf_bytes_yield_none() {
        assert!(extract_pdf_text(b"BT (not a pdf) ET").is_none());
    }

    #[test]
    fn bt_inside_longer_token_is_not_a_text_object() {
        let pdf = b"%PDF-1.4\n/SUBTYPE (skipped)\n";
        assert!(extract_pdf_text(pdf).is_none());
    }

    #[test]
    fn content_types_map_by_extension() {
        assert_eq!(content_type_for("a.pdf"), "application/pdf");
        assert_eq!(content_type_for("a.txt"), "text/plain");
        assert_eq!(content_type_for("a.bin"), "application/octet-stream");
    }
}
