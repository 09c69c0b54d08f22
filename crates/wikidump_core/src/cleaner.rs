use std::sync::OnceLock;

use regex::Regex;

static COMMENT_RE: OnceLock<Regex> = OnceLock::new();
static WRAPPER_RE: OnceLock<Regex> = OnceLock::new();

#[allow(clippy::expect_used)]
fn comment_re() -> &'static Regex {
    COMMENT_RE.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment regex"))
}

#[allow(clippy::expect_used)]
fn wrapper_re() -> &'static Regex {
    WRAPPER_RE.get_or_init(|| {
        Regex::new(r#"(?s)<div\b[^>]*\bclass\s*=\s*"(?:[^"]*\s)?mw-parser-output(?:\s[^"]*)?"[^>]*>(.*)</div>"#)
            .expect("valid wrapper regex")
    })
}

/// Strip comments and the `mw-parser-output` wrapper from rendered page HTML
/// and put an `<h1>` with the page title on top.
///
/// The heading is only emitted when `title` is non-empty; an empty body with a
/// title yields the heading alone.
pub fn clean_content(html: &str, title: &str) -> String {
    let without_comments = comment_re().replace_all(html, "");
    let unwrapped = match wrapper_re().captures(&without_comments) {
        Some(captures) => captures
            .get(1)
            .map(|inner| inner.as_str().to_string())
            .unwrap_or_default(),
        None => without_comments.into_owned(),
    };
    let body = unwrapped.trim();

    if title.is_empty() {
        return body.to_string();
    }
    let heading = format!("<h1>{}</h1>", escape_html(title));
    if body.is_empty() {
        heading
    } else {
        format!("{heading}\n{body}")
    }
}

/// Escape `&`, `<`, `>` and `"`, ampersand first.
pub fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
