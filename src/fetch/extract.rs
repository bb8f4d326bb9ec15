//! HTML → primary-content text.
//!
//! Non-content blocks are removed first, then the first available
//! primary-content container (`<main>`, `<article>`, `role="main"`, `<body>`)
//! is rendered to plain text.

use std::sync::LazyLock;

use html2text::render::text_renderer::TrivialDecorator;
use regex::Regex;

/// Elements whose whole subtree never contributes content.
const NON_CONTENT_TAGS: [&str; 11] = [
    "script", "style", "noscript", "template", "svg", "iframe", "form", "nav", "header",
    "footer", "aside",
];

const RENDER_WIDTH: usize = 400;

static COMMENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

static NON_CONTENT: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    NON_CONTENT_TAGS
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).expect("valid regex")
        })
        .collect()
});

static MAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<main\b[^>]*>(.*?)</main\s*>").expect("valid regex"));

static ARTICLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<article\b[^>]*>(.*?)</article\s*>").expect("valid regex")
});

static ROLE_MAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<(div|section)\b[^>]*\brole\s*=\s*["']?main["']?[^>]*>"#)
        .expect("valid regex")
});

static BLOCK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(/?)(div|section)\b[^>]*?(/?)>").expect("valid regex"));

static BODY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<body\b[^>]*>(.*?)(?:</body\s*>|$)").expect("valid regex"));

static INLINE_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").expect("valid regex"));

/// Extract readable text from an HTML document. A rendering failure yields
/// an empty string, which callers see as thin content.
pub fn extract_text(html: &str) -> String {
    let cleaned = strip_non_content(html);
    let fragment = primary_container(&cleaned);
    match html2text::config::with_decorator(TrivialDecorator::new())
        .string_from_read(fragment.as_bytes(), RENDER_WIDTH)
    {
        Ok(rendered) => normalize_whitespace(&rendered),
        Err(e) => {
            tracing::warn!(error = %e, "html rendering failed");
            String::new()
        }
    }
}

/// Remove comments and non-content elements.
pub fn strip_non_content(html: &str) -> String {
    let mut out = COMMENTS.replace_all(html, " ").into_owned();
    for pattern in NON_CONTENT.iter() {
        out = pattern.replace_all(&out, " ").into_owned();
    }
    out
}

/// Pick the most specific content container present, falling back to the whole input.
fn primary_container(html: &str) -> String {
    let mains = collect_inner(&MAIN, html);
    if !mains.is_empty() {
        return mains;
    }
    let articles = collect_inner(&ARTICLE, html);
    if !articles.is_empty() {
        return articles;
    }
    if let Some(c) = ROLE_MAIN.captures(html) {
        if let (Some(open), Some(tag)) = (c.get(0), c.get(1)) {
            return balanced_inner(html, tag.as_str(), open.end()).to_string();
        }
    }
    if let Some(body) = BODY.captures(html).and_then(|c| c.get(1)) {
        return body.as_str().to_string();
    }
    html.to_string()
}

/// Content from `start` up to the closing tag that balances an already-open
/// `tag`. An unclosed element runs to the end of the input.
fn balanced_inner<'a>(html: &'a str, tag: &str, start: usize) -> &'a str {
    let mut depth = 1usize;
    for c in BLOCK_TAG.captures_iter(&html[start..]) {
        let (Some(whole), Some(name)) = (c.get(0), c.get(2)) else {
            continue;
        };
        if !name.as_str().eq_ignore_ascii_case(tag) {
            continue;
        }
        let closing = c.get(1).is_some_and(|m| !m.is_empty());
        let self_closing = c.get(3).is_some_and(|m| !m.is_empty());
        if closing {
            depth -= 1;
            if depth == 0 {
                return &html[start..start + whole.start()];
            }
        } else if !self_closing {
            depth += 1;
        }
    }
    &html[start..]
}

fn collect_inner(pattern: &Regex, html: &str) -> String {
    pattern
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|inner| !inner.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse runs of inline whitespace and drop blank lines.
pub fn normalize_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| INLINE_SPACE.replace_all(line.trim(), " ").into_owned())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
