//! Shared HTML plumbing for the generated pages

/// Escape text for safe interpolation into HTML body or attribute position
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wrap a body in the standard document skeleton.
/// `head_extra` lands verbatim inside <head> (stylesheet links or inline CSS).
pub fn document(title: &str, head_extra: &str, body: &str) -> String {
    let mut page = String::with_capacity(body.len() + 512);
    page.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    page.push_str("<meta charset=\"UTF-8\">\n");
    page.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    page.push_str(&format!("<title>{}</title>\n", escape(title)));
    page.push_str(head_extra);
    page.push_str("</head>\n<body>\n");
    page.push_str(body);
    page.push_str("\n</body>\n</html>\n");
    page
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_all_special_chars() {
        assert_eq!(
            escape("<a href=\"x\">R&D 'note'</a>"),
            "&lt;a href=&quot;x&quot;&gt;R&amp;D &#39;note&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_escape_passes_unicode_through() {
        assert_eq!(escape("受注テーブル → orders"), "受注テーブル → orders");
    }

    #[test]
    fn test_document_skeleton() {
        let page = document("Audit <1>", "<style>body{}</style>", "<p>hi</p>");
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<title>Audit &lt;1&gt;</title>"));
        assert!(page.contains("<style>body{}</style>"));
        assert!(page.contains("<p>hi</p>"));
        assert!(page.trim_end().ends_with("</html>"));
    }
}
