//! Page shell shared by the HTML flows.

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Inline error block, empty when there is no error.
pub fn error_block(error: Option<&str>) -> String {
    error
        .map(|e| format!(r#"<div class="error">Error: {}</div>"#, escape(e)))
        .unwrap_or_default()
}

/// Wraps `body` in the common document. `title` is escaped, `body` is not.
pub fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en"><head>
<meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1">
<title>{title}</title>
<style>{style}</style>
</head><body>
<nav><a href="/">Home</a> <a href="/users">Users</a> <a href="/dashboard">Dashboard</a></nav>
<main>
{body}
</main>
</body></html>"#,
        title = escape(title),
        style = base_style(),
    )
}

fn base_style() -> &'static str {
    r#"
    body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
           background: #f5f5f5; color: #333; margin: 0; }
    nav { background: #fff; padding: 12px 20px; border-bottom: 1px solid #ddd; }
    nav a { margin-right: 12px; color: #0366d6; text-decoration: none; }
    main { max-width: 720px; margin: 24px auto; background: #fff; padding: 24px;
           border-radius: 12px; box-shadow: 0 4px 24px rgba(0,0,0,0.08); }
    .error { background: #fdecea; color: #b71c1c; padding: 10px 12px;
             border-radius: 8px; margin-bottom: 16px; }
    form label { display: block; margin-top: 12px; }
    form input { width: 100%; padding: 8px; box-sizing: border-box; }
    form button { margin-top: 16px; padding: 8px 16px; }
    table { width: 100%; border-collapse: collapse; }
    th, td { text-align: left; padding: 8px; border-bottom: 1px solid #eee; }
    "#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape(r#"<a href="x">O'Neil & co</a>"#),
            "&lt;a href=&quot;x&quot;&gt;O&#x27;Neil &amp; co&lt;/a&gt;"
        );
    }

    #[test]
    fn error_block_is_optional() {
        assert_eq!(error_block(None), "");
        assert!(error_block(Some("<b>")).contains("Error: &lt;b&gt;"));
    }

    #[test]
    fn page_escapes_title_only() {
        let html = page("<t>", "<p>ok</p>");
        assert!(html.contains("<title>&lt;t&gt;</title>"));
        assert!(html.contains("<p>ok</p>"));
    }
}
